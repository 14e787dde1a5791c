//! `spec.md` §8, scenario 4: a claim created with `ttl=0` is born expired.

use crate::service::{ClaimOps, CreateClaimRequest, MessageOps, ZephyrError};

use super::{client, harness, post_n, project, queue};

#[tokio::test]
async fn zero_ttl_claim_is_immediately_unreachable() {
    let (driver, _clock) = harness();
    let project = project();
    let queue = queue("work");
    post_n(&driver, &project, &queue, &client("producer"), 5, 120).await;

    let (claim_id, _messages) = driver
        .create(
            &project,
            &queue,
            CreateClaimRequest {
                ttl_seconds: 0,
                grace_seconds: 60,
                limit: 10,
            },
        )
        .await
        .unwrap();

    let get_err = driver.get(&project, &queue, claim_id).await.unwrap_err();
    assert!(matches!(get_err, ZephyrError::ClaimDoesNotExist { .. }));

    let update_err = driver
        .update(&project, &queue, claim_id, 60)
        .await
        .unwrap_err();
    assert!(matches!(update_err, ZephyrError::ClaimDoesNotExist { .. }));
}
