//! `spec.md` §4.4 — the Partitions controller (proxy layer): weighted
//! round-robin node selection across registered partitions.

use async_trait::async_trait;

use super::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub name: String,
    pub weight: u32,
    pub nodes: Vec<String>,
    /// Next node index to hand out, mod `nodes.len()`. Persisted durably
    /// enough that a restart does not re-hotspot `nodes[0]` (`spec.md` §4.4).
    pub rotating_index: u64,
}

#[async_trait]
pub trait PartitionOps: Send + Sync {
    /// `weight` must be `>= 1`; `nodes` must be non-empty.
    async fn create(&self, name: &str, weight: u32, nodes: Vec<String>) -> Result<()>;

    /// Fails `PartitionNotFound` if absent.
    async fn get(&self, name: &str) -> Result<Partition>;

    async fn list(&self) -> Result<Vec<Partition>>;

    async fn delete(&self, name: &str) -> Result<()>;

    /// Two-stage selection: pick a partition with probability proportional
    /// to its weight, then take the node at its rotating index and
    /// post-increment that index modulo the node count. Fails
    /// `NoPartitionsRegistered` if none exist.
    async fn select(&self) -> Result<String>;
}

/// Picks a partition index from `weights` with probability proportional to
/// each weight, using `draw` as the source of randomness in `[0, total)`.
/// Pulled out as a pure function so selection bias is unit-testable without
/// exercising the full async trait (`spec.md` §8, scenario 8).
#[must_use]
pub fn weighted_pick(weights: &[u32], draw: u64) -> usize {
    let mut remaining = draw;
    for (idx, weight) in weights.iter().enumerate() {
        let weight = u64::from(*weight);
        if remaining < weight {
            return idx;
        }
        remaining -= weight;
    }
    weights.len().saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_pick_covers_full_range() {
        let weights = [1u32, 3];
        // total weight = 4; draws 0 -> partition 0, 1..4 -> partition 1
        assert_eq!(weighted_pick(&weights, 0), 0);
        assert_eq!(weighted_pick(&weights, 1), 1);
        assert_eq!(weighted_pick(&weights, 3), 1);
    }
}
