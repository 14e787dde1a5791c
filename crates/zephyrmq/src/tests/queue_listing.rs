//! `spec.md` §8, scenario 1: listing with the default limit.

use crate::service::{ListQueuesQuery, QueueOps};

use super::{harness, project};

#[tokio::test]
async fn default_limit_paginates_fifteen_queues_into_two_pages() {
    let (driver, _clock) = harness();
    let project = project();

    for i in 0..15 {
        assert!(driver.create(&project, &super::queue(&i.to_string())).await.unwrap());
    }

    let first = driver
        .list(
            &project,
            ListQueuesQuery {
                marker: None,
                limit: 10,
                detailed: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(first.items.len(), 10);
    assert!(first.items.iter().all(|q| q.metadata.is_some()));
    let marker = first.next_marker.expect("more queues remain");

    let second = driver
        .list(
            &project,
            ListQueuesQuery {
                marker: Some(marker),
                limit: 10,
                detailed: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(second.items.len(), 5);
    assert!(second.next_marker.is_none());

    // No queue is seen twice across the traversal (§3 invariant 6).
    let mut seen: Vec<String> = first
        .items
        .iter()
        .chain(second.items.iter())
        .map(|q| q.name.as_str().to_string())
        .collect();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 15);
}

#[tokio::test]
async fn re_create_is_idempotent_and_does_not_touch_metadata() {
    let (driver, _clock) = harness();
    let project = project();
    let q = super::queue("orders");

    assert!(driver.create(&project, &q).await.unwrap());
    driver
        .set_metadata(&project, &q, std::iter::once(("k".to_string(), serde_json::json!("v"))).collect())
        .await
        .unwrap();

    assert!(!driver.create(&project, &q).await.unwrap());
    let metadata = driver.get_metadata(&project, &q).await.unwrap();
    assert_eq!(metadata.get("k"), Some(&serde_json::json!("v")));
}

#[tokio::test]
async fn delete_cascades_and_is_idempotent() {
    let (driver, _clock) = harness();
    let project = project();
    let q = super::queue("ephemeral");

    driver.create(&project, &q).await.unwrap();
    super::post_n(&driver, &project, &q, &super::client("c1"), 3, 60).await;

    driver.delete(&project, &q).await.unwrap();
    assert!(!driver.exists(&project, &q).await.unwrap());
    driver.delete(&project, &q).await.unwrap(); // idempotent, no error

    let stats = driver.stats(&project, &q).await.unwrap();
    assert_eq!(stats.total, 0);
}
