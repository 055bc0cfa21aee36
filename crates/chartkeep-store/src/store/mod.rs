//! Store backends
//!
//! Two concerns are modelled separately:
//! - `ArtifactStore`: ConfigMap-shaped objects holding chart files
//! - `ResourceCatalog`: chart records and configuration documents
//!
//! `KubeStore` implements both against a cluster, `MockStore` in memory.

mod cluster;
mod mock;

pub use cluster::KubeStore;
pub use mock::{MockStore, OperationCounts};

use async_trait::async_trait;
use chartkeep_core::ChartRecord;

use crate::error::{Result, StoreError};
use crate::object::{LabelSelector, StoredObject, ValuesDocument};

/// Maximum payload of a single ConfigMap (1MB - some overhead)
pub const MAX_ARTIFACT_SIZE: usize = 1_000_000;

/// Generic access to labeled key/value objects
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Get one object by name
    async fn get(&self, namespace: &str, name: &str) -> Result<StoredObject>;

    /// List objects carrying every label of the selector
    async fn list(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<StoredObject>>;

    /// Create a new object
    async fn create(&self, object: &StoredObject) -> Result<()>;

    /// Update an existing mutable object
    async fn update(&self, object: &StoredObject) -> Result<()>;

    /// Delete an object by name
    async fn delete(&self, namespace: &str, name: &str) -> Result<()>;

    /// Create or replace an object
    ///
    /// Immutable objects cannot be updated in place, so an existing
    /// immutable object is deleted and recreated.
    async fn apply(&self, object: &StoredObject) -> Result<()> {
        match self.get(&object.namespace, &object.name).await {
            Ok(existing) if existing.immutable || object.immutable => {
                self.delete(&object.namespace, &object.name).await?;
                self.create(object).await
            }
            Ok(_) => self.update(object).await,
            Err(StoreError::NotFound { .. }) => self.create(object).await,
            Err(e) => Err(e),
        }
    }
}

/// Access to chart records and configuration documents
#[async_trait]
pub trait ResourceCatalog: Send + Sync {
    /// Get the record of one chart in one repository
    async fn get_chart(&self, namespace: &str, repository: &str, name: &str) -> Result<ChartRecord>;

    /// List chart records carrying every label of the selector
    async fn list_charts(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<ChartRecord>>;

    /// Create or replace a chart record
    async fn put_chart(&self, namespace: &str, record: &ChartRecord) -> Result<()>;

    /// Get one configuration document by name
    async fn get_values(&self, namespace: &str, name: &str) -> Result<ValuesDocument>;
}

/// A backend providing both artifacts and catalog resources
pub trait ChartStore: ArtifactStore + ResourceCatalog {}

impl<T: ArtifactStore + ResourceCatalog + ?Sized> ChartStore for T {}
