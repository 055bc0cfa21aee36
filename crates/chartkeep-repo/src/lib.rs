//! chartkeep Repo - cold-start import of charts into the store
//!
//! This crate provides:
//! - **Fetching**: `ArchiveFetcher` and the HTTP implementation with a short
//!   client-side timeout and optional basic auth
//! - **Repository index**: Helm `index.yaml` lookup and download URL resolution
//! - **Archives**: in-memory unpacking of packaged charts
//! - **Import**: encode, store and record a chart version with pinned
//!   dependencies

pub mod archive;
pub mod error;
pub mod fetch;
pub mod import;
pub mod index;

pub use archive::ChartArchive;
pub use error::{RepoError, Result};
pub use fetch::{ArchiveFetcher, BasicAuth, DEFAULT_FETCH_TIMEOUT, HttpArchiveFetcher};
pub use import::{ChartImporter, ImportReport, ImportTarget};
pub use index::{ChartEntry, RepositoryIndex, index_url, resolve_reference_url};
