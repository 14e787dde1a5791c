//! `spec.md` §4.1 — the Queue controller contract.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    error::Result,
    ids::{ProjectId, QueueName},
    pagination::{Marker, Page, DEFAULT_LIMIT},
};

/// Opaque key-value metadata attached to a queue.
pub type Metadata = HashMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct QueueRecord {
    pub name: QueueName,
    /// Present only when the caller asked for `detailed = true`.
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageStat {
    pub id: String,
    pub created: DateTime<Utc>,
}

/// `spec.md` §3 invariant 5: `free + claimed == total`, counting only
/// non-expired messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub free: u64,
    pub claimed: u64,
    pub total: u64,
    pub oldest: Option<MessageStat>,
    pub newest: Option<MessageStat>,
}

impl QueueStats {
    #[must_use]
    pub fn assert_invariant(&self) -> bool {
        self.free + self.claimed == self.total
    }
}

/// Query parameters for [`QueueOps::list`], mirroring `spec.md` §4.1.
#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct ListQueuesQuery {
    #[builder(default)]
    pub marker: Option<Marker>,
    #[builder(default = DEFAULT_LIMIT)]
    pub limit: usize,
    #[builder(default)]
    pub detailed: bool,
}

impl Default for ListQueuesQuery {
    fn default() -> Self {
        Self {
            marker: None,
            limit: DEFAULT_LIMIT,
            detailed: false,
        }
    }
}

/// The storage contract for queue lifecycle and statistics. One stateless
/// façade per driver, per `spec.md` §2.
#[async_trait]
pub trait QueueOps: Send + Sync {
    /// Idempotent: returns `true` iff a new record was persisted. A
    /// pre-existing queue is left untouched (no metadata mutation).
    async fn create(&self, project: &ProjectId, name: &QueueName) -> Result<bool>;

    async fn exists(&self, project: &ProjectId, name: &QueueName) -> Result<bool>;

    /// Fails with [`crate::service::error::ZephyrError::QueueDoesNotExist`]
    /// if absent.
    async fn get_metadata(&self, project: &ProjectId, name: &QueueName) -> Result<Metadata>;

    /// Replaces metadata wholesale.
    async fn set_metadata(
        &self,
        project: &ProjectId,
        name: &QueueName,
        metadata: Metadata,
    ) -> Result<()>;

    /// Idempotent; cascades to every message and claim owned by the queue.
    async fn delete(&self, project: &ProjectId, name: &QueueName) -> Result<()>;

    async fn list(&self, project: &ProjectId, query: ListQueuesQuery) -> Result<Page<QueueRecord>>;

    /// Excludes expired messages; `oldest`/`newest` are `None` iff `total == 0`.
    async fn stats(&self, project: &ProjectId, name: &QueueName) -> Result<QueueStats>;
}
