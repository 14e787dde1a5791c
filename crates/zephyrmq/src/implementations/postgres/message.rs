use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use super::{dbutils::DbErrorHandler, PostgresDriver};
use crate::service::{
    ids::{ClaimId, ClientUuid, MsgId, ProjectId, QueueName},
    message::{ListMessagesQuery, Message, MessageOps, MessageSpec},
    pagination::{Marker, Page},
    Result, ZephyrError,
};

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    body: Json<serde_json::Value>,
    ttl_seconds: i64,
    created_at: DateTime<Utc>,
    client_uuid: String,
    claim_id: Option<Uuid>,
    claim_expires_at: Option<DateTime<Utc>>,
}

impl MessageRow {
    fn into_message(self, queue: &QueueName, now: DateTime<Utc>) -> Message {
        let claim_id = match (self.claim_id, self.claim_expires_at) {
            (Some(id), Some(expires_at)) if expires_at > now => Some(ClaimId::from(id)),
            _ => None,
        };
        Message {
            id: MsgId::from(self.id),
            queue: queue.clone(),
            body: self.body.0,
            ttl_seconds: self.ttl_seconds as u64,
            created_at: self.created_at,
            client_uuid: Some(ClientUuid::new(self.client_uuid)),
            claim_id,
        }
    }
}

#[async_trait]
impl MessageOps for PostgresDriver {
    async fn post(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        client_uuid: &ClientUuid,
        specs: Vec<MessageSpec>,
    ) -> Result<Vec<MsgId>> {
        let now = self.clock.now();
        let mut ids = Vec::with_capacity(specs.len());
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| e.into_zephyr_error("starting post transaction"))?;

        for spec in specs {
            let id = MsgId::generate();
            sqlx::query(
                "INSERT INTO messages
                    (id, project, queue_name, body, ttl_seconds, created_at, client_uuid)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(id.as_uuid())
            .bind(project.as_str())
            .bind(queue.as_str())
            .bind(Json(spec.body))
            .bind(spec.ttl_seconds as i64)
            .bind(now)
            .bind(client_uuid.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| e.into_zephyr_error("posting message"))?;
            ids.push(id);
        }

        tx.commit()
            .await
            .map_err(|e| e.into_zephyr_error("committing post transaction"))?;
        Ok(ids)
    }

    async fn get(&self, project: &ProjectId, queue: &QueueName, msg_id: MsgId) -> Result<Message> {
        let now = self.clock.now();
        let row: Option<MessageRow> = sqlx::query_as(
            "SELECT id, body, ttl_seconds, created_at, client_uuid, claim_id, claim_expires_at
             FROM messages
             WHERE project = $1 AND queue_name = $2 AND id = $3
               AND now() < created_at + (ttl_seconds || ' seconds')::interval",
        )
        .bind(project.as_str())
        .bind(queue.as_str())
        .bind(msg_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("loading message"))?;

        row.map(|r| r.into_message(queue, now))
            .ok_or_else(|| ZephyrError::MessageDoesNotExist {
                queue: queue.to_string(),
                msg_id: msg_id.to_string(),
            })
    }

    async fn bulk_get(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        ids: &[MsgId],
    ) -> Result<Vec<Message>> {
        let now = self.clock.now();
        let uuids: Vec<Uuid> = ids.iter().map(MsgId::as_uuid).collect();
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, body, ttl_seconds, created_at, client_uuid, claim_id, claim_expires_at
             FROM messages
             WHERE project = $1 AND queue_name = $2 AND id = ANY($3)
               AND now() < created_at + (ttl_seconds || ' seconds')::interval",
        )
        .bind(project.as_str())
        .bind(queue.as_str())
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("bulk loading messages"))?;

        // Preserve the order callers asked for.
        let mut by_id: std::collections::HashMap<Uuid, MessageRow> =
            rows.into_iter().map(|r| (r.id, r)).collect();
        Ok(ids
            .iter()
            .filter_map(|id| by_id.remove(&id.as_uuid()))
            .map(|r| r.into_message(queue, now))
            .collect())
    }

    async fn delete(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        msg_id: MsgId,
        claim: Option<ClaimId>,
    ) -> Result<()> {
        let now = self.clock.now();
        let row: Option<(Option<Uuid>, Option<DateTime<Utc>>)> = sqlx::query_as(
            "SELECT claim_id, claim_expires_at FROM messages
             WHERE project = $1 AND queue_name = $2 AND id = $3",
        )
        .bind(project.as_str())
        .bind(queue.as_str())
        .bind(msg_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("loading message for delete"))?;

        let Some((claim_id, claim_expires_at)) = row else {
            return Ok(());
        };
        let live_claim = match (claim_id, claim_expires_at) {
            (Some(id), Some(expires_at)) if expires_at > now => Some(id),
            _ => None,
        };

        // `spec.md` §3 invariant 3: permitted iff the caller supplies no
        // claim token and the message is unclaimed, or the supplied claim
        // equals the live claim. A well-formed but stale/wrong claim token
        // against an unclaimed message is also `NotPermitted` (§8 scenario 2).
        if claim.map(|c| c.as_uuid()) != live_claim {
            return Err(ZephyrError::not_permitted(
                "supplied claim does not match this message's current live claim",
            ));
        }

        sqlx::query("DELETE FROM messages WHERE project = $1 AND queue_name = $2 AND id = $3")
            .bind(project.as_str())
            .bind(queue.as_str())
            .bind(msg_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| e.into_zephyr_error("deleting message"))?;
        Ok(())
    }

    async fn bulk_delete(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        ids: &[MsgId],
    ) -> Result<()> {
        let uuids: Vec<Uuid> = ids.iter().map(MsgId::as_uuid).collect();
        sqlx::query(
            "DELETE FROM messages
             WHERE project = $1 AND queue_name = $2 AND id = ANY($3)",
        )
        .bind(project.as_str())
        .bind(queue.as_str())
        .bind(&uuids)
        .execute(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("bulk deleting messages"))?;
        Ok(())
    }

    async fn list(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        query: ListMessagesQuery,
    ) -> Result<Page<Message>> {
        let now = self.clock.now();
        let marker = match &query.marker {
            Some(m) => match Marker::decode_message(m.as_str()) {
                Some(decoded) => Some(decoded),
                None => return Ok(Page::empty()),
            },
            None => None,
        };
        let (marker_ts, marker_id) = marker
            .map(|(ts, id)| (Some(ts), Some(id.as_uuid())))
            .unwrap_or((None, None));

        let fetch_limit = query.limit as i64 + 1;
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, body, ttl_seconds, created_at, client_uuid, claim_id, claim_expires_at
             FROM messages
             WHERE project = $1 AND queue_name = $2
               AND now() < created_at + (ttl_seconds || ' seconds')::interval
               AND ($3::timestamptz IS NULL
                    OR (created_at, id) > ($3, $4))
               AND ($5 OR client_uuid <> $6)
               AND ($7 OR NOT (claim_id IS NOT NULL AND claim_expires_at > now()))
             ORDER BY created_at ASC, id ASC
             LIMIT $8",
        )
        .bind(project.as_str())
        .bind(queue.as_str())
        .bind(marker_ts)
        .bind(marker_id)
        .bind(query.echo)
        .bind(query.client_uuid.as_ref().map(ClientUuid::as_str).unwrap_or(""))
        .bind(query.include_claimed)
        .bind(fetch_limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("listing messages"))?;

        let has_more = rows.len() > query.limit;
        let items: Vec<Message> = rows
            .into_iter()
            .take(query.limit)
            .map(|r| r.into_message(queue, now))
            .collect();

        let next_marker = if has_more {
            items
                .last()
                .map(|m| Marker::for_message(m.created_at, m.id))
        } else {
            None
        };

        Ok(Page { items, next_marker })
    }
}
