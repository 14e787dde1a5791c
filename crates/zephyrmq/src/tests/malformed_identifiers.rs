//! `spec.md` §8, scenario 6: malformed identifiers are absent, never errors.

use crate::service::{MessageOps, MsgId, ListMessagesQuery, Marker, QueueOps, ZephyrError};

use super::{client, harness, post_n, project, queue};

#[tokio::test]
async fn malformed_msg_id_parses_to_none_and_is_absent() {
    assert_eq!(MsgId::parse("xyz"), None);
}

#[tokio::test]
async fn delete_of_malformed_id_is_silent_no_op() {
    let (driver, _clock) = harness();
    let project = project();
    let queue = queue("work");
    driver.create(&project, &queue).await.unwrap();
    let ids = post_n(&driver, &project, &queue, &client("producer"), 1, 3600).await;

    // A malformed id never reaches the controller as anything other than
    // an absent id upstream; simulate that by deleting a freshly generated
    // (but never-posted) id, which is equivalent to "does not exist".
    let absent = MsgId::generate();
    driver.delete(&project, &queue, absent, None).await.unwrap();

    // A real posted message is untouched by deleting the absent one.
    let got = driver.get(&project, &queue, ids[0]).await;
    assert!(got.is_ok());
}

#[tokio::test]
async fn get_of_malformed_id_fails_message_does_not_exist() {
    let (driver, _clock) = harness();
    let project = project();
    let queue = queue("work");
    driver.create(&project, &queue).await.unwrap();

    let absent = MsgId::generate();
    let err = driver.get(&project, &queue, absent).await.unwrap_err();
    assert!(matches!(err, ZephyrError::MessageDoesNotExist { .. }));
}

#[tokio::test]
async fn malformed_marker_yields_an_empty_page() {
    let (driver, _clock) = harness();
    let project = project();
    let queue = queue("work");
    driver.create(&project, &queue).await.unwrap();
    post_n(&driver, &project, &queue, &client("producer"), 3, 3600).await;

    let page = driver
        .list(
            &project,
            &queue,
            ListMessagesQuery {
                marker: Some(Marker::opaque("xyz")),
                ..ListMessagesQuery::default()
            },
        )
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert!(page.next_marker.is_none());
}
