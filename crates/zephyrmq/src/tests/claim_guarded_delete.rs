//! `spec.md` §8, scenario 2: claim-guarded delete.

use crate::service::{ClaimOps, CreateClaimRequest, MessageOps, ZephyrError};

use super::{client, harness, post_n, project, queue};

#[tokio::test]
async fn only_the_owning_claim_may_delete_a_claimed_message() {
    let (driver, _clock) = harness();
    let project = project();
    let queue = queue("jobs");
    let client_uuid = client("producer");

    let ids = post_n(&driver, &project, &queue, &client_uuid, 12, 3600).await;
    assert_eq!(ids.len(), 12);

    let (cid_a, msgs_a) = driver
        .create(
            &project,
            &queue,
            CreateClaimRequest {
                ttl_seconds: 70,
                grace_seconds: 60,
                limit: 10,
            },
        )
        .await
        .unwrap();
    assert_eq!(msgs_a.len(), 10);

    let (cid_b, msgs_b) = driver
        .create(
            &project,
            &queue,
            CreateClaimRequest {
                ttl_seconds: 70,
                grace_seconds: 60,
                limit: 10,
            },
        )
        .await
        .unwrap();
    // Only 2 messages were left unclaimed after claim A took 10 of 12.
    assert_eq!(msgs_b.len(), 2);

    let m1 = msgs_b[0].id;
    let m2 = msgs_b[1].id;

    // Claim A does not own m1 (it belongs to claim B).
    let err = driver
        .delete(&project, &queue, m1, Some(cid_a))
        .await
        .unwrap_err();
    assert!(matches!(err, ZephyrError::NotPermitted { .. }));

    // Claim B does own m1.
    driver.delete(&project, &queue, m1, Some(cid_b)).await.unwrap();

    // Re-deleting an already-absent id is a silent no-op.
    driver.delete(&project, &queue, m1, Some(cid_b)).await.unwrap();

    // Releasing claim B returns m2 to unclaimed visibility...
    ClaimOps::delete(&driver, &project, &queue, cid_b).await.unwrap();

    // ...but `cid_b` is no longer live, so supplying it still fails: a
    // well-formed claim token that does not match the message's current
    // (absent) live claim is `NotPermitted`, not a free pass.
    let err = driver
        .delete(&project, &queue, m2, Some(cid_b))
        .await
        .unwrap_err();
    assert!(matches!(err, ZephyrError::NotPermitted { .. }));

    // Supplying no claim token at all against the now-unclaimed message
    // succeeds.
    driver.delete(&project, &queue, m2, None).await.unwrap();
}

#[tokio::test]
async fn malformed_claim_token_against_live_claim_is_not_permitted() {
    // `spec.md` §9 Open Question 1, decided: a malformed claim token parses
    // to `None` upstream (ids.rs), so by the time the controller sees it,
    // it is indistinguishable from "no token supplied" — which still fails
    // against a live-claimed message.
    let (driver, _clock) = harness();
    let project = project();
    let queue = queue("jobs");
    let ids = post_n(&driver, &project, &queue, &client("producer"), 1, 3600).await;

    driver
        .create(
            &project,
            &queue,
            CreateClaimRequest {
                ttl_seconds: 70,
                grace_seconds: 60,
                limit: 10,
            },
        )
        .await
        .unwrap();

    assert!(crate::service::ClaimId::parse("; DROP TABLE queues").is_none());
    let err = driver.delete(&project, &queue, ids[0], None).await.unwrap_err();
    assert!(matches!(err, ZephyrError::NotPermitted { .. }));
}
