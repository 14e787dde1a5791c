//! End-to-end coverage of `spec.md` §8's concrete scenarios, run against
//! [`crate::implementations::memory::MemoryDriver`] so the full claim/message
//! lifecycle is exercised without a live Postgres instance — the same
//! purpose the teacher's Postgres-only `#[sqlx::test]` suite serves for
//! `lakekeeper`, adapted here because this crate's storage contracts admit
//! an in-process backend the teacher's do not.

use std::sync::Arc;

use chrono::Utc;

use crate::{
    implementations::memory::MemoryDriver,
    service::{ClaimOps, ClientUuid, FrozenClock, MessageOps, ProjectId, QueueName, SharedClock},
};

mod claim_guarded_delete;
mod echo_filter;
mod expired_claim;
mod expired_message;
mod malformed_identifiers;
mod partition_selection;
mod queue_listing;
mod ttl_extension;

/// A fresh in-memory driver plus its backing clock, so a test can advance
/// time deterministically without sleeping.
pub(crate) fn harness() -> (MemoryDriver, FrozenClock) {
    let clock = FrozenClock::at(Utc::now());
    let shared: SharedClock = Arc::new(clock.clone());
    (MemoryDriver::new(shared), clock)
}

pub(crate) fn project() -> ProjectId {
    ProjectId::new("project")
}

pub(crate) fn queue(name: &str) -> QueueName {
    QueueName::new(name)
}

pub(crate) fn client(id: &str) -> ClientUuid {
    ClientUuid::new(id)
}

/// Posts `count` messages with the given ttl under `client_uuid`, returning
/// the assigned ids in post order.
pub(crate) async fn post_n(
    driver: &MemoryDriver,
    project: &ProjectId,
    queue: &QueueName,
    client_uuid: &ClientUuid,
    count: usize,
    ttl_seconds: u64,
) -> Vec<crate::service::MsgId> {
    let specs = (0..count)
        .map(|i| crate::service::MessageSpec {
            ttl_seconds,
            body: serde_json::json!({ "n": i }),
        })
        .collect();
    driver.post(project, queue, client_uuid, specs).await.unwrap()
}
