//! chartkeep Core - shared types for the chart artifact store
//!
//! This crate provides the foundational types used throughout chartkeep:
//! - `ChartRecord` / `ChartVersion`: stored chart metadata and its version list
//! - `ChartDependency`: a declared dependency with its condition path
//! - `ChartFile`: one logical file of a chart (templates, CRDs)
//! - `Condition`: two-segment dot path gating dependency inclusion
//! - `Values`: configuration values with deep merge support

pub mod chart;
pub mod condition;
pub mod error;
pub mod values;

pub use chart::{
    CHART_LABEL, ChartDependency, ChartFile, ChartMetadata, ChartRecord, ChartVersion,
    ChartYamlDependency, REPO_GROUP_LABEL, REPO_LABEL, is_exact_version, parse_version_req,
};
pub use condition::{Condition, parse_bool};
pub use error::{CoreError, Result};
pub use values::{Values, parse_set_values};
