//! `spec.md` §8, scenario 3: claim creation extends every claimed message's
//! TTL to `max(remaining_ttl, claim_ttl + grace)`.

use crate::service::{ClaimOps, CreateClaimRequest, MessageOps};

use super::{client, harness, post_n, project, queue};

async fn claimed_ttls(ttl: u64, grace: u64) -> Vec<u64> {
    let (driver, _clock) = harness();
    let project = project();
    let queue = queue("work");
    post_n(&driver, &project, &queue, &client("producer"), 20, 120).await;

    let (_cid, messages) = driver
        .create(
            &project,
            &queue,
            CreateClaimRequest {
                ttl_seconds: ttl,
                grace_seconds: grace,
                limit: 20,
            },
        )
        .await
        .unwrap();
    messages.iter().map(|m| m.ttl_seconds).collect()
}

#[tokio::test]
async fn ttl_777_grace_23_extends_every_message_to_800() {
    let ttls = claimed_ttls(777, 23).await;
    assert_eq!(ttls.len(), 20);
    assert!(ttls.iter().all(|&t| t == 800));
}

#[tokio::test]
async fn ttl_100_grace_22_extends_every_message_to_122() {
    let ttls = claimed_ttls(100, 22).await;
    assert!(ttls.iter().all(|&t| t == 122));
}

#[tokio::test]
async fn ttl_60_grace_30_leaves_remaining_ttl_of_120_untouched() {
    // remaining (120) already exceeds ttl+grace (90), so the message keeps
    // its original remaining TTL.
    let ttls = claimed_ttls(60, 30).await;
    assert!(ttls.iter().all(|&t| t == 120));
}
