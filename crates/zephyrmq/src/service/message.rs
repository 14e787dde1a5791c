//! `spec.md` §4.2 — the Message controller contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{
    error::Result,
    ids::{ClaimId, ClientUuid, MsgId, ProjectId, QueueName},
    pagination::{Marker, Page, DEFAULT_LIMIT},
};

/// A message as supplied by a producer to `post`.
#[derive(Debug, Clone)]
pub struct MessageSpec {
    pub ttl_seconds: u64,
    pub body: Value,
}

/// A message as returned to a reader. `claim_id` is `Some` only while the
/// message has a live claim.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MsgId,
    pub queue: QueueName,
    pub body: Value,
    pub ttl_seconds: u64,
    pub created_at: DateTime<Utc>,
    pub client_uuid: Option<ClientUuid>,
    pub claim_id: Option<ClaimId>,
}

impl Message {
    /// Seconds remaining before expiry, given `now`. Saturates at zero —
    /// `spec.md` §4.2 requires TTL=0 messages to be reachable for exactly
    /// one instant before expiring.
    #[must_use]
    pub fn ttl_remaining(&self, now: DateTime<Utc>) -> i64 {
        let expires_at = self.created_at + chrono::Duration::seconds(self.ttl_seconds as i64);
        (expires_at - now).num_seconds().max(0)
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let expires_at = self.created_at + chrono::Duration::seconds(self.ttl_seconds as i64);
        now >= expires_at
    }
}

/// Query parameters for [`MessageOps::list`], mirroring `spec.md` §4.2.
#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct ListMessagesQuery {
    #[builder(default)]
    pub marker: Option<Marker>,
    #[builder(default = DEFAULT_LIMIT)]
    pub limit: usize,
    /// Include the caller's own `client_uuid` messages.
    #[builder(default)]
    pub echo: bool,
    #[builder(default)]
    pub include_claimed: bool,
    #[builder(default)]
    pub client_uuid: Option<ClientUuid>,
}

impl Default for ListMessagesQuery {
    fn default() -> Self {
        Self {
            marker: None,
            limit: DEFAULT_LIMIT,
            echo: false,
            include_claimed: false,
            client_uuid: None,
        }
    }
}

/// The storage contract for message lifecycle. `spec.md` §3 invariant 4:
/// an expired message is indistinguishable from a non-existent one here.
#[async_trait]
pub trait MessageOps: Send + Sync {
    /// Accepts specs in input order, returns newly assigned ids in the
    /// same order. TTL is measured in seconds from the driver's clock at
    /// the moment of insertion.
    async fn post(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        client_uuid: &ClientUuid,
        specs: Vec<MessageSpec>,
    ) -> Result<Vec<MsgId>>;

    /// Fails `MessageDoesNotExist` if missing or expired. A malformed
    /// `msg_id` should already have failed to parse upstream, in which case
    /// callers never reach this method — see `spec.md` §7.
    async fn get(&self, project: &ProjectId, queue: &QueueName, msg_id: MsgId) -> Result<Message>;

    /// Silently skips ids that are absent or expired; preserves the order
    /// of the ids that are present.
    async fn bulk_get(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        ids: &[MsgId],
    ) -> Result<Vec<Message>>;

    /// Idempotent on absent ids. If `claim` is `Some` and does not match
    /// the message's current live claim, fails `NotPermitted`.
    async fn delete(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        msg_id: MsgId,
        claim: Option<ClaimId>,
    ) -> Result<()>;

    /// Best-effort: ids that are already absent are silently skipped.
    async fn bulk_delete(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        ids: &[MsgId],
    ) -> Result<()>;

    async fn list(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        query: ListMessagesQuery,
    ) -> Result<Page<Message>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(ttl: u64, created_at: DateTime<Utc>) -> Message {
        Message {
            id: MsgId::generate(),
            queue: QueueName::new("q"),
            body: Value::Null,
            ttl_seconds: ttl,
            created_at,
            client_uuid: None,
            claim_id: None,
        }
    }

    #[test]
    fn ttl_zero_is_born_expired() {
        let now = Utc::now();
        let m = msg(0, now);
        assert!(m.is_expired(now));
    }

    #[test]
    fn ttl_remaining_saturates_at_zero() {
        let now = Utc::now();
        let m = msg(10, now - chrono::Duration::seconds(30));
        assert_eq!(m.ttl_remaining(now), 0);
    }
}
