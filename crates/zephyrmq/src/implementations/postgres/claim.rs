//! Claim creation has to win a race against every other caller hitting the
//! same queue at once (`spec.md` §3 invariant 1/2). `FOR UPDATE SKIP LOCKED`
//! lets concurrent `create` calls each walk past messages a sibling
//! transaction already has locked instead of blocking on them, so two
//! claims never settle on the same message.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use super::{dbutils::DbErrorHandler, PostgresDriver};
use crate::service::{
    claim::{extend_ttl, ClaimMeta, ClaimOps, CreateClaimRequest},
    ids::{ClaimId, ClientUuid, MsgId, ProjectId, QueueName},
    message::Message,
    Result, ZephyrError,
};

#[derive(sqlx::FromRow)]
struct CandidateRow {
    id: Uuid,
    body: Json<serde_json::Value>,
    ttl_seconds: i64,
    created_at: DateTime<Utc>,
    client_uuid: String,
}

#[async_trait]
impl ClaimOps for PostgresDriver {
    async fn create(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        request: CreateClaimRequest,
    ) -> Result<(ClaimId, Vec<Message>)> {
        let now = self.clock.now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| e.into_zephyr_error("starting claim transaction"))?;

        let candidates: Vec<CandidateRow> = sqlx::query_as(
            "SELECT id, body, ttl_seconds, created_at, client_uuid
             FROM messages
             WHERE project = $1 AND queue_name = $2
               AND now() < created_at + (ttl_seconds || ' seconds')::interval
               AND (claim_id IS NULL OR claim_expires_at <= now())
             ORDER BY created_at ASC, id ASC
             LIMIT $3
             FOR UPDATE SKIP LOCKED",
        )
        .bind(project.as_str())
        .bind(queue.as_str())
        .bind(request.limit as i64)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| e.into_zephyr_error("selecting claim candidates"))?;

        let claim_id = ClaimId::generate();
        let expires_at = now + chrono::Duration::seconds(request.ttl_seconds as i64);

        sqlx::query(
            "INSERT INTO claims (id, project, queue_name, ttl_seconds, grace_seconds, created_at, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(claim_id.as_uuid())
        .bind(project.as_str())
        .bind(queue.as_str())
        .bind(request.ttl_seconds as i64)
        .bind(request.grace_seconds as i64)
        .bind(now)
        .bind(expires_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| e.into_zephyr_error("recording new claim"))?;

        let mut messages = Vec::with_capacity(candidates.len());
        for row in candidates {
            let remaining = ((row.created_at
                + chrono::Duration::seconds(row.ttl_seconds))
                - now)
                .num_seconds()
                .max(0) as u64;
            let new_ttl = extend_ttl(remaining, request.ttl_seconds, request.grace_seconds);

            sqlx::query(
                "UPDATE messages SET claim_id = $1, claim_expires_at = $2, ttl_seconds = $3
                 WHERE id = $4",
            )
            .bind(claim_id.as_uuid())
            .bind(expires_at)
            .bind(new_ttl as i64)
            .bind(row.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.into_zephyr_error("assigning message to claim"))?;

            messages.push(Message {
                id: MsgId::from(row.id),
                queue: queue.clone(),
                body: row.body.0,
                ttl_seconds: new_ttl,
                created_at: row.created_at,
                client_uuid: Some(ClientUuid::new(row.client_uuid)),
                claim_id: Some(claim_id),
            });
        }

        tx.commit()
            .await
            .map_err(|e| e.into_zephyr_error("committing claim transaction"))?;
        Ok((claim_id, messages))
    }

    async fn get(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        claim_id: ClaimId,
    ) -> Result<(ClaimMeta, Vec<Message>)> {
        let now = self.clock.now();
        let row: Option<(i64, i64, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT ttl_seconds, grace_seconds, created_at, expires_at
             FROM claims
             WHERE project = $1 AND queue_name = $2 AND id = $3 AND expires_at > now()",
        )
        .bind(project.as_str())
        .bind(queue.as_str())
        .bind(claim_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("loading claim"))?;

        let Some((ttl_seconds, grace_seconds, created_at, expires_at)) = row else {
            return Err(ZephyrError::ClaimDoesNotExist {
                queue: queue.to_string(),
                claim_id: claim_id.to_string(),
            });
        };

        let rows: Vec<CandidateRow> = sqlx::query_as(
            "SELECT id, body, ttl_seconds, created_at, client_uuid
             FROM messages
             WHERE project = $1 AND queue_name = $2 AND claim_id = $3 AND claim_expires_at > now()
             ORDER BY created_at ASC, id ASC",
        )
        .bind(project.as_str())
        .bind(queue.as_str())
        .bind(claim_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("loading claimed messages"))?;

        let messages = rows
            .into_iter()
            .map(|row| Message {
                id: MsgId::from(row.id),
                queue: queue.clone(),
                body: row.body.0,
                ttl_seconds: row.ttl_seconds as u64,
                created_at: row.created_at,
                client_uuid: Some(ClientUuid::new(row.client_uuid)),
                claim_id: Some(claim_id),
            })
            .collect();

        Ok((
            ClaimMeta {
                id: claim_id,
                ttl_seconds: ttl_seconds as u64,
                grace_seconds: grace_seconds as u64,
                created_at,
                expires_at,
            },
            messages,
        ))
    }

    async fn update(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        claim_id: ClaimId,
        ttl_seconds: u64,
    ) -> Result<()> {
        let now = self.clock.now();
        let new_expires_at = now + chrono::Duration::seconds(ttl_seconds as i64);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| e.into_zephyr_error("starting claim update transaction"))?;

        let result = sqlx::query(
            "UPDATE claims SET ttl_seconds = $1, expires_at = $2
             WHERE project = $3 AND queue_name = $4 AND id = $5 AND expires_at > now()",
        )
        .bind(ttl_seconds as i64)
        .bind(new_expires_at)
        .bind(project.as_str())
        .bind(queue.as_str())
        .bind(claim_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| e.into_zephyr_error("renewing claim"))?;

        if result.rows_affected() == 0 {
            return Err(ZephyrError::ClaimDoesNotExist {
                queue: queue.to_string(),
                claim_id: claim_id.to_string(),
            });
        }

        // Ownership is tracked denormalized on `messages`; follow the
        // renewed expiry so the messages don't appear to fall free early.
        sqlx::query("UPDATE messages SET claim_expires_at = $1 WHERE claim_id = $2")
            .bind(new_expires_at)
            .bind(claim_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| e.into_zephyr_error("propagating claim renewal to messages"))?;

        tx.commit()
            .await
            .map_err(|e| e.into_zephyr_error("committing claim update transaction"))?;
        Ok(())
    }

    async fn delete(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        claim_id: ClaimId,
    ) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| e.into_zephyr_error("starting claim delete transaction"))?;

        sqlx::query("UPDATE messages SET claim_id = NULL, claim_expires_at = NULL WHERE claim_id = $1")
            .bind(claim_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| e.into_zephyr_error("releasing claimed messages"))?;

        sqlx::query("DELETE FROM claims WHERE project = $1 AND queue_name = $2 AND id = $3")
            .bind(project.as_str())
            .bind(queue.as_str())
            .bind(claim_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| e.into_zephyr_error("deleting claim"))?;

        tx.commit()
            .await
            .map_err(|e| e.into_zephyr_error("committing claim delete transaction"))?;
        Ok(())
    }
}
