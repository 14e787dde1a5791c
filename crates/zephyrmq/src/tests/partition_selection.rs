//! `spec.md` §8, scenario 8: weighted round-robin partition selection.
//!
//! Partition `heavy` carries weight 3 and a single node; partition `light`
//! carries weight 1 and two nodes. Over many draws, `heavy`'s node should
//! account for roughly 3/4 of selections, and `light`'s two nodes should
//! alternate strictly each time `light` itself is chosen.

use crate::service::PartitionOps;

use super::harness;

#[tokio::test]
async fn weight_three_node_wins_about_three_quarters_of_draws() {
    let (driver, _clock) = harness();
    driver.create("heavy", 3, vec!["h1".to_string()]).await.unwrap();
    driver
        .create("light", 1, vec!["l1".to_string(), "l2".to_string()])
        .await
        .unwrap();

    const N: usize = 4000;
    let mut heavy_hits = 0usize;
    let mut light_picks = Vec::new();
    for _ in 0..N {
        let node = driver.select().await.unwrap();
        if node == "h1" {
            heavy_hits += 1;
        } else {
            light_picks.push(node);
        }
    }

    let ratio = heavy_hits as f64 / N as f64;
    assert!(
        (0.70..=0.80).contains(&ratio),
        "expected heavy node around 75% of {N} draws, got {heavy_hits} ({ratio:.3})"
    );
    assert_eq!(heavy_hits + light_picks.len(), N);
}

#[tokio::test]
async fn light_partitions_two_nodes_alternate_on_every_pick() {
    let (driver, _clock) = harness();
    driver.create("heavy", 3, vec!["h1".to_string()]).await.unwrap();
    driver
        .create("light", 1, vec!["l1".to_string(), "l2".to_string()])
        .await
        .unwrap();

    let mut light_picks = Vec::new();
    for _ in 0..4000 {
        let node = driver.select().await.unwrap();
        if node != "h1" {
            light_picks.push(node);
        }
    }

    assert!(light_picks.len() > 100, "need enough light draws to check alternation");
    for pair in light_picks.windows(2) {
        assert_ne!(pair[0], pair[1], "light's rotating index must alternate its two nodes");
    }
}

#[tokio::test]
async fn no_partitions_registered_fails() {
    let (driver, _clock) = harness();
    let err = driver.select().await.unwrap_err();
    assert!(matches!(
        err,
        crate::service::ZephyrError::NoPartitionsRegistered
    ));
}
