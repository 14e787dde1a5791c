//! `spec.md` §4.5 — the Catalogue controller (proxy layer): maps
//! `(project, queue) -> (location, metadata)`.

use async_trait::async_trait;

use super::{
    error::Result,
    ids::{ProjectId, QueueName},
    pagination::{Marker, Page, DEFAULT_LIMIT},
    queue::Metadata,
};

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogueEntry {
    pub project: ProjectId,
    pub queue: QueueName,
    /// Present unless the caller asked to omit it via `include_location`.
    pub location: Option<String>,
    /// Present only when `include_metadata = true`.
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct ListCatalogueQuery {
    #[builder(default)]
    pub marker: Option<Marker>,
    #[builder(default = DEFAULT_LIMIT)]
    pub limit: usize,
    #[builder(default)]
    pub include_metadata: bool,
    #[builder(default)]
    pub include_location: bool,
}

impl Default for ListCatalogueQuery {
    fn default() -> Self {
        Self {
            marker: None,
            limit: DEFAULT_LIMIT,
            include_metadata: false,
            include_location: false,
        }
    }
}

/// `spec.md` §9 Open Question 2 is decided here: `insert` on an existing
/// `(project, queue)` is rejected with `EntryAlreadyExists` rather than
/// silently overwriting.
#[async_trait]
pub trait CatalogueOps: Send + Sync {
    async fn insert(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        location: &str,
        metadata: Metadata,
    ) -> Result<()>;

    /// Fails `EntryNotFound` if absent.
    async fn get(&self, project: &ProjectId, queue: &QueueName) -> Result<CatalogueEntry>;

    /// Must scale to large project populations — the catalogue is a
    /// primary index for queue listing (`spec.md` §4.5).
    async fn list(&self, project: &ProjectId, query: ListCatalogueQuery)
        -> Result<Page<CatalogueEntry>>;

    async fn delete(&self, project: &ProjectId, queue: &QueueName) -> Result<()>;

    async fn location(&self, project: &ProjectId, queue: &QueueName) -> Result<String>;

    async fn update_metadata(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        metadata: Metadata,
    ) -> Result<()>;

    async fn r#move(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        new_location: &str,
    ) -> Result<()>;
}
