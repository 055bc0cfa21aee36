//! chartkeep Engine - turn stored charts into install-ready bundles
//!
//! This crate provides:
//! - **Composition**: merge a graph of cross-referencing configuration
//!   documents into one values map (`Composer`)
//! - **Dependency resolution**: condition gating, version pinning and
//!   recursive materialization of sub-charts (`Resolver`)
//! - **Assembly**: the full pipeline from a chart request to a validated
//!   `MaterializedBundle` under a deadline (`Assembler`)

pub mod assembler;
pub mod bundle;
pub mod compose;
pub mod dependency;
pub mod error;

pub use assembler::{AssembleRequest, Assembler, AssemblerConfig};
pub use bundle::{BundleMetadata, MaterializedBundle};
pub use compose::{Composer, ComposerConfig, EdgeParent, ValuesRef, parse_payload, refs_with_parent};
pub use dependency::{
    ChartContent, RepoSelector, Resolution, Resolver, ResolverConfig, SkipReason,
    SkippedDependency, pin_dependencies, pin_version,
};
pub use error::{EngineError, Result};
