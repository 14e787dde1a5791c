use async_trait::async_trait;
use sqlx::types::Json;

use super::{dbutils::DbErrorHandler, PostgresDriver};
use crate::service::{
    catalogue::{CatalogueEntry, CatalogueOps, ListCatalogueQuery},
    ids::{ProjectId, QueueName},
    pagination::{Marker, Page},
    queue::Metadata,
    Result, ZephyrError,
};

#[async_trait]
impl CatalogueOps for PostgresDriver {
    async fn insert(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        location: &str,
        metadata: Metadata,
    ) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO catalogue_entries (project, queue_name, location, metadata)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (project, queue_name) DO NOTHING",
        )
        .bind(project.as_str())
        .bind(queue.as_str())
        .bind(location)
        .bind(Json(metadata))
        .execute(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("inserting catalogue entry"))?;

        if result.rows_affected() == 0 {
            return Err(ZephyrError::EntryAlreadyExists {
                project: project.to_string(),
                queue: queue.to_string(),
            });
        }
        Ok(())
    }

    async fn get(&self, project: &ProjectId, queue: &QueueName) -> Result<CatalogueEntry> {
        let row: Option<(String, Json<Metadata>)> = sqlx::query_as(
            "SELECT location, metadata FROM catalogue_entries
             WHERE project = $1 AND queue_name = $2",
        )
        .bind(project.as_str())
        .bind(queue.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("loading catalogue entry"))?;

        let (location, Json(metadata)) =
            row.ok_or_else(|| ZephyrError::EntryNotFound {
                project: project.to_string(),
                queue: queue.to_string(),
            })?;

        Ok(CatalogueEntry {
            project: project.clone(),
            queue: queue.clone(),
            location: Some(location),
            metadata: Some(metadata),
        })
    }

    async fn list(
        &self,
        project: &ProjectId,
        query: ListCatalogueQuery,
    ) -> Result<Page<CatalogueEntry>> {
        let marker = match &query.marker {
            Some(m) => match Marker::decode_catalogue_key(m.as_str()) {
                Some(decoded) => Some(decoded),
                None => return Ok(Page::empty()),
            },
            None => None,
        };
        let marker_queue = marker.as_ref().map(|(_, queue)| queue.clone());

        let fetch_limit = query.limit as i64 + 1;
        let rows: Vec<(String, Json<Metadata>)> = sqlx::query_as(
            "SELECT queue_name, metadata FROM catalogue_entries
             WHERE project = $1 AND ($2::text IS NULL OR queue_name > $2)
             ORDER BY queue_name
             LIMIT $3",
        )
        .bind(project.as_str())
        .bind(marker_queue)
        .bind(fetch_limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("listing catalogue entries"))?;

        let has_more = rows.len() > query.limit;
        let items: Vec<CatalogueEntry> = rows
            .into_iter()
            .take(query.limit)
            .map(|(queue_name, Json(metadata))| CatalogueEntry {
                project: project.clone(),
                queue: QueueName::new(queue_name),
                location: None,
                metadata: query.include_metadata.then_some(metadata),
            })
            .collect();

        let next_marker = if has_more {
            items
                .last()
                .map(|e| Marker::for_catalogue_key(project.as_str(), e.queue.as_str()))
        } else {
            None
        };

        let items = if query.include_location {
            let mut with_location = Vec::with_capacity(items.len());
            for entry in items {
                let location: (String,) = sqlx::query_as(
                    "SELECT location FROM catalogue_entries WHERE project = $1 AND queue_name = $2",
                )
                .bind(project.as_str())
                .bind(entry.queue.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| e.into_zephyr_error("loading catalogue entry location"))?;
                with_location.push(CatalogueEntry {
                    location: Some(location.0),
                    ..entry
                });
            }
            with_location
        } else {
            items
        };

        Ok(Page { items, next_marker })
    }

    async fn delete(&self, project: &ProjectId, queue: &QueueName) -> Result<()> {
        sqlx::query("DELETE FROM catalogue_entries WHERE project = $1 AND queue_name = $2")
            .bind(project.as_str())
            .bind(queue.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| e.into_zephyr_error("deleting catalogue entry"))?;
        Ok(())
    }

    async fn location(&self, project: &ProjectId, queue: &QueueName) -> Result<String> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT location FROM catalogue_entries WHERE project = $1 AND queue_name = $2",
        )
        .bind(project.as_str())
        .bind(queue.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("loading catalogue entry location"))?;

        row.map(|(location,)| location)
            .ok_or_else(|| ZephyrError::EntryNotFound {
                project: project.to_string(),
                queue: queue.to_string(),
            })
    }

    async fn update_metadata(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        metadata: Metadata,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE catalogue_entries SET metadata = $3 WHERE project = $1 AND queue_name = $2",
        )
        .bind(project.as_str())
        .bind(queue.as_str())
        .bind(Json(metadata))
        .execute(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("updating catalogue entry metadata"))?;

        if result.rows_affected() == 0 {
            return Err(ZephyrError::EntryNotFound {
                project: project.to_string(),
                queue: queue.to_string(),
            });
        }
        Ok(())
    }

    async fn r#move(
        &self,
        project: &ProjectId,
        queue: &QueueName,
        new_location: &str,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE catalogue_entries SET location = $3 WHERE project = $1 AND queue_name = $2",
        )
        .bind(project.as_str())
        .bind(queue.as_str())
        .bind(new_location)
        .execute(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("moving catalogue entry"))?;

        if result.rows_affected() == 0 {
            return Err(ZephyrError::EntryNotFound {
                project: project.to_string(),
                queue: queue.to_string(),
            });
        }
        Ok(())
    }
}
