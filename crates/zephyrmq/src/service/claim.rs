//! `spec.md` §4.3 — the Claim controller contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    error::Result,
    ids::{ClaimId, ProjectId, QueueName},
    message::Message,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ClaimMeta {
    pub id: ClaimId,
    pub ttl_seconds: u64,
    pub grace_seconds: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ClaimMeta {
    #[must_use]
    pub fn age_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_seconds().max(0)
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// `spec.md` §4.3 "Message-TTL extension rules on claim creation":
/// `new_ttl = max(remaining_ttl, claim_ttl + grace)`. A message held by a
/// live claim never expires out from under its holder, and `grace` adds a
/// safety margin past claim expiry during which a delete still succeeds.
#[must_use]
pub fn extend_ttl(remaining_ttl: u64, claim_ttl: u64, grace: u64) -> u64 {
    remaining_ttl.max(claim_ttl.saturating_add(grace))
}

#[derive(Debug, Clone)]
pub struct CreateClaimRequest {
    pub ttl_seconds: u64,
    pub grace_seconds: u64,
    pub limit: usize,
}

/// The storage contract for claim creation, inspection, renewal, and
/// release. `spec.md` §3 invariant 1: a message has at most one live claim
/// at any instant; invariant 2: a claim only ever acquires messages that
/// were unclaimed or whose previous claim had already expired.
#[async_trait]
pub trait ClaimOps: Send + Sync {
    /// Atomically selects up to `request.limit` unclaimed, non-expired
    /// messages FIFO by `created_at`, assigns them to a new claim, and
    /// extends each selected message's TTL per [`extend_ttl`]. Two
    /// concurrent calls against the same queue must never both acquire the
    /// same message (`spec.md` §5, "Ordering guarantees").
    async fn create(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        request: CreateClaimRequest,
    ) -> Result<(ClaimId, Vec<Message>)>;

    /// Fails `ClaimDoesNotExist` if absent or expired.
    async fn get(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        claim_id: ClaimId,
    ) -> Result<(ClaimMeta, Vec<Message>)>;

    /// Resets `expires_at = now + ttl`. Does not touch the set of owned
    /// messages or their individual TTLs (`spec.md` §9, Open Question 3).
    async fn update(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        claim_id: ClaimId,
        ttl_seconds: u64,
    ) -> Result<()>;

    /// Idempotent; releases every owned message back to unclaimed
    /// visibility.
    async fn delete(&self, project: &ProjectId, queue: &QueueName, claim_id: ClaimId)
        -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `spec.md` §4.3 worked cases, pinned literally.
    #[test]
    fn extend_ttl_worked_cases() {
        assert_eq!(extend_ttl(120, 777, 0), 777);
        assert_eq!(extend_ttl(120, 777, 23), 800);
        assert_eq!(extend_ttl(120, 100, 22), 122);
        assert_eq!(extend_ttl(120, 60, 30), 120);
    }
}
