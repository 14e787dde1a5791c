//! `spec.md` §8, scenario 7: a caller's own `client_uuid` is excluded from
//! `list` by default, included when `echo=true`, paginated either way.

use crate::service::{ListMessagesQuery, MessageOps, QueueOps};

use super::{client, harness, post_n, project, queue};

#[tokio::test]
async fn default_list_excludes_the_callers_own_client_uuid() {
    let (driver, _clock) = harness();
    let project = project();
    let queue = queue("work");
    driver.create(&project, &queue).await.unwrap();
    let mine = client("my_uuid");
    post_n(&driver, &project, &queue, &mine, 15, 3600).await;

    let page = driver
        .list(
            &project,
            &queue,
            ListMessagesQuery {
                client_uuid: Some(mine.clone()),
                ..ListMessagesQuery::default()
            },
        )
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert!(page.next_marker.is_none());
}

#[tokio::test]
async fn echo_true_includes_the_callers_own_messages_and_still_paginates() {
    let (driver, _clock) = harness();
    let project = project();
    let queue = queue("work");
    driver.create(&project, &queue).await.unwrap();
    let mine = client("my_uuid");
    post_n(&driver, &project, &queue, &mine, 15, 3600).await;

    let first = driver
        .list(
            &project,
            &queue,
            ListMessagesQuery {
                client_uuid: Some(mine.clone()),
                echo: true,
                ..ListMessagesQuery::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(first.items.len(), 10);
    let marker = first.next_marker.clone().expect("more messages remain");

    let second = driver
        .list(
            &project,
            &queue,
            ListMessagesQuery {
                client_uuid: Some(mine.clone()),
                echo: true,
                marker: Some(marker),
                ..ListMessagesQuery::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(second.items.len(), 5);
    assert!(second.next_marker.is_none());

    let mut seen: Vec<_> = first.items.iter().chain(second.items.iter()).map(|m| m.id).collect();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 15);
}

#[tokio::test]
async fn other_clients_messages_are_always_visible_regardless_of_echo() {
    let (driver, _clock) = harness();
    let project = project();
    let queue = queue("work");
    driver.create(&project, &queue).await.unwrap();
    post_n(&driver, &project, &queue, &client("my_uuid"), 5, 3600).await;
    post_n(&driver, &project, &queue, &client("someone_else"), 2, 3600).await;

    let page = driver
        .list(
            &project,
            &queue,
            ListMessagesQuery {
                client_uuid: Some(client("my_uuid")),
                ..ListMessagesQuery::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);
    assert!(page
        .items
        .iter()
        .all(|m| m.client_uuid.as_ref().unwrap().as_str() == "someone_else"));
}
