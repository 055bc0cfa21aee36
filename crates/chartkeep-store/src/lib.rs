//! chartkeep Store - chart artifacts on a flat key/value object store
//!
//! This crate provides:
//! - **Object model**: `StoredObject` (ConfigMap-shaped), `LabelSelector`, `ValuesDocument`
//! - **Store traits**: `ArtifactStore` for artifacts, `ResourceCatalog` for chart
//!   records and configuration documents
//! - **Backends**: `KubeStore` (ConfigMaps plus `Chart`/`Values` resources) and
//!   `MockStore` (in memory, for tests)
//! - **Codec**: encode a chart version's files into labeled artifacts and decode
//!   them back, with default values stored as one JSON blob

pub mod codec;
pub mod error;
pub mod object;
pub mod resources;
pub mod store;

pub use codec::{
    ArtifactKind, EncodedChart, decode, delete_artifacts, encode, encode_default_values,
    load_default_values, store_artifacts,
};
pub use error::{Result, StoreError};
pub use object::{LabelSelector, StoredObject, ValuesDocument};
pub use store::{
    ArtifactStore, ChartStore, KubeStore, MAX_ARTIFACT_SIZE, MockStore, OperationCounts,
    ResourceCatalog,
};
