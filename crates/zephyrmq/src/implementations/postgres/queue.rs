use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;

use super::{dbutils::DbErrorHandler, PostgresDriver};
use crate::service::{
    pagination::Marker,
    queue::{ListQueuesQuery, Metadata, QueueRecord, QueueStats},
    MessageStat, ProjectId, QueueName, QueueOps, Result, ZephyrError,
};

#[async_trait]
impl QueueOps for PostgresDriver {
    async fn create(&self, project: &ProjectId, name: &QueueName) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO queues (project, name) VALUES ($1, $2)
             ON CONFLICT (project, name) DO NOTHING",
        )
        .bind(project.as_str())
        .bind(name.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("creating queue"))?;

        Ok(result.rows_affected() == 1)
    }

    async fn exists(&self, project: &ProjectId, name: &QueueName) -> Result<bool> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT 1 FROM queues WHERE project = $1 AND name = $2",
        )
        .bind(project.as_str())
        .bind(name.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("checking queue existence"))?;

        Ok(row.is_some())
    }

    async fn get_metadata(&self, project: &ProjectId, name: &QueueName) -> Result<Metadata> {
        let row: Option<(Json<Metadata>,)> = sqlx::query_as(
            "SELECT metadata FROM queues WHERE project = $1 AND name = $2",
        )
        .bind(project.as_str())
        .bind(name.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("loading queue metadata"))?;

        row.map(|(Json(metadata),)| metadata)
            .ok_or_else(|| ZephyrError::QueueDoesNotExist {
                project: project.to_string(),
                queue: name.to_string(),
            })
    }

    async fn set_metadata(
        &self,
        project: &ProjectId,
        name: &QueueName,
        metadata: Metadata,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE queues SET metadata = $3 WHERE project = $1 AND name = $2",
        )
        .bind(project.as_str())
        .bind(name.as_str())
        .bind(Json(metadata))
        .execute(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("updating queue metadata"))?;

        if result.rows_affected() == 0 {
            return Err(ZephyrError::QueueDoesNotExist {
                project: project.to_string(),
                queue: name.to_string(),
            });
        }
        Ok(())
    }

    async fn delete(&self, project: &ProjectId, name: &QueueName) -> Result<()> {
        sqlx::query("DELETE FROM queues WHERE project = $1 AND name = $2")
            .bind(project.as_str())
            .bind(name.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| e.into_zephyr_error("deleting queue"))?;
        Ok(())
    }

    async fn list(
        &self,
        project: &ProjectId,
        query: ListQueuesQuery,
    ) -> Result<crate::service::Page<QueueRecord>> {
        let marker = query
            .marker
            .as_ref()
            .and_then(|m| Marker::decode_queue_name(m.as_str()));
        // A malformed marker yields an empty page rather than an error.
        if query.marker.is_some() && marker.is_none() {
            return Ok(crate::service::Page::empty());
        }

        let fetch_limit = query.limit as i64 + 1;
        let rows: Vec<(String, Json<Metadata>)> = sqlx::query_as(
            "SELECT name, metadata FROM queues
             WHERE project = $1 AND ($2::text IS NULL OR name > $2)
             ORDER BY name
             LIMIT $3",
        )
        .bind(project.as_str())
        .bind(marker)
        .bind(fetch_limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("listing queues"))?;

        let has_more = rows.len() > query.limit;
        let items: Vec<QueueRecord> = rows
            .into_iter()
            .take(query.limit)
            .map(|(name, Json(metadata))| QueueRecord {
                name: QueueName::new(name),
                metadata: query.detailed.then_some(metadata),
            })
            .collect();

        let next_marker = if has_more {
            items.last().map(|r| Marker::for_queue_name(r.name.as_str()))
        } else {
            None
        };

        Ok(crate::service::Page { items, next_marker })
    }

    async fn stats(&self, project: &ProjectId, name: &QueueName) -> Result<QueueStats> {
        let counts: (i64, i64, i64) = sqlx::query_as(
            "SELECT
                count(*) FILTER (WHERE NOT (claim_id IS NOT NULL AND claim_expires_at > now())),
                count(*) FILTER (WHERE claim_id IS NOT NULL AND claim_expires_at > now()),
                count(*)
             FROM messages
             WHERE project = $1 AND queue_name = $2
               AND now() < created_at + (ttl_seconds || ' seconds')::interval",
        )
        .bind(project.as_str())
        .bind(name.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("computing queue stats"))?;

        let (free, claimed, total) = counts;
        if total == 0 {
            return Ok(QueueStats {
                free: 0,
                claimed: 0,
                total: 0,
                oldest: None,
                newest: None,
            });
        }

        let oldest: (uuid::Uuid, chrono::DateTime<Utc>) = sqlx::query_as(
            "SELECT id, created_at FROM messages
             WHERE project = $1 AND queue_name = $2
               AND now() < created_at + (ttl_seconds || ' seconds')::interval
             ORDER BY created_at ASC, id ASC LIMIT 1",
        )
        .bind(project.as_str())
        .bind(name.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("loading oldest message stat"))?;

        let newest: (uuid::Uuid, chrono::DateTime<Utc>) = sqlx::query_as(
            "SELECT id, created_at FROM messages
             WHERE project = $1 AND queue_name = $2
               AND now() < created_at + (ttl_seconds || ' seconds')::interval
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(project.as_str())
        .bind(name.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("loading newest message stat"))?;

        Ok(QueueStats {
            free: free as u64,
            claimed: claimed as u64,
            total: total as u64,
            oldest: Some(MessageStat {
                id: oldest.0.to_string(),
                created: oldest.1,
            }),
            newest: Some(MessageStat {
                id: newest.0.to_string(),
                created: newest.1,
            }),
        })
    }
}
