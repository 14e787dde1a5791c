use async_trait::async_trait;
use sqlx::types::Json;

use super::{dbutils::DbErrorHandler, PostgresDriver};
use crate::service::{
    partition::{weighted_pick, Partition, PartitionOps},
    Result, ZephyrError,
};

#[derive(sqlx::FromRow)]
struct PartitionRow {
    name: String,
    weight: i32,
    nodes: Json<Vec<String>>,
    rotating_index: i64,
}

impl From<PartitionRow> for Partition {
    fn from(row: PartitionRow) -> Self {
        Partition {
            name: row.name,
            weight: row.weight as u32,
            nodes: row.nodes.0,
            rotating_index: row.rotating_index as u64,
        }
    }
}

#[async_trait]
impl PartitionOps for PostgresDriver {
    async fn create(&self, name: &str, weight: u32, nodes: Vec<String>) -> Result<()> {
        if nodes.is_empty() {
            return Err(ZephyrError::validation("partition requires at least one node"));
        }
        sqlx::query(
            "INSERT INTO partitions (name, weight, nodes, rotating_index)
             VALUES ($1, $2, $3, 0)
             ON CONFLICT (name) DO UPDATE SET weight = EXCLUDED.weight, nodes = EXCLUDED.nodes",
        )
        .bind(name)
        .bind(weight as i32)
        .bind(Json(nodes))
        .execute(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("creating partition"))?;
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Partition> {
        let row: Option<PartitionRow> = sqlx::query_as(
            "SELECT name, weight, nodes, rotating_index FROM partitions WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("loading partition"))?;

        row.map(Partition::from).ok_or_else(|| ZephyrError::PartitionNotFound {
            name: name.to_string(),
        })
    }

    async fn list(&self) -> Result<Vec<Partition>> {
        let rows: Vec<PartitionRow> = sqlx::query_as(
            "SELECT name, weight, nodes, rotating_index FROM partitions ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.into_zephyr_error("listing partitions"))?;
        Ok(rows.into_iter().map(Partition::from).collect())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        sqlx::query("DELETE FROM partitions WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| e.into_zephyr_error("deleting partition"))?;
        Ok(())
    }

    async fn select(&self) -> Result<String> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| e.into_zephyr_error("starting partition selection transaction"))?;

        let rows: Vec<PartitionRow> = sqlx::query_as(
            "SELECT name, weight, nodes, rotating_index FROM partitions ORDER BY name FOR UPDATE",
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| e.into_zephyr_error("loading partitions for selection"))?;

        if rows.is_empty() {
            return Err(ZephyrError::NoPartitionsRegistered);
        }

        let weights: Vec<u32> = rows.iter().map(|r| r.weight as u32).collect();
        let total: u64 = weights.iter().map(|w| u64::from(*w)).sum();
        let draw = if total == 0 { 0 } else { fastrand::u64(0..total) };
        let chosen_idx = weighted_pick(&weights, draw);
        let chosen = &rows[chosen_idx];

        let node_idx = (chosen.rotating_index as usize) % chosen.nodes.0.len();
        let node = chosen.nodes.0[node_idx].clone();
        let next_index = chosen.rotating_index + 1;

        sqlx::query("UPDATE partitions SET rotating_index = $1 WHERE name = $2")
            .bind(next_index)
            .bind(&chosen.name)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.into_zephyr_error("advancing partition rotating index"))?;

        tx.commit()
            .await
            .map_err(|e| e.into_zephyr_error("committing partition selection"))?;
        Ok(node)
    }
}
