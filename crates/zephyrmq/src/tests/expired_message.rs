//! `spec.md` §8, scenario 5: a `ttl=0` message is born expired and is
//! invisible to reads and excluded from `free` stats.

use crate::service::{MessageOps, MessageSpec, QueueOps, ZephyrError};

use super::{client, harness, project, queue};

#[tokio::test]
async fn zero_ttl_message_is_unreachable_and_not_counted_free() {
    let (driver, _clock) = harness();
    let project = project();
    let queue = queue("work");
    driver.create(&project, &queue).await.unwrap();
    let client_uuid = client("producer");

    let specs = vec![
        MessageSpec {
            ttl_seconds: 0,
            body: serde_json::json!(3.14),
        },
        MessageSpec {
            ttl_seconds: 0,
            body: serde_json::json!(3.14),
        },
    ];
    let ids = driver
        .post(&project, &queue, &client_uuid, specs)
        .await
        .unwrap();

    let err = driver.get(&project, &queue, ids[1]).await.unwrap_err();
    assert!(matches!(err, ZephyrError::MessageDoesNotExist { .. }));

    let stats = driver.stats(&project, &queue).await.unwrap();
    assert_eq!(stats.free, 0);
    assert!(stats.assert_invariant());
}
