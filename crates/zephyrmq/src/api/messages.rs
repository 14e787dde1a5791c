use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    error::{ApiError, ApiResult},
    validation::{clamp_limit, validate_body_size, validate_message_ttl},
    AppState,
};
use crate::service::{ClaimId, ClientUuid, ListMessagesQuery, Marker, Message, MsgId, ProjectId, QueueName};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/queues/{queue_name}/messages",
            post(post_messages).get(list_messages).delete(bulk_delete_messages),
        )
        .route(
            "/queues/{queue_name}/messages/{message_id}",
            get(get_message).delete(delete_message),
        )
}

#[derive(Debug, Deserialize)]
pub struct PostMessageSpec {
    ttl: u64,
    body: Value,
}

#[derive(Debug, Deserialize)]
pub struct PostMessagesRequest {
    messages: Vec<PostMessageSpec>,
}

#[derive(Debug, Serialize)]
pub struct PostMessagesResponse {
    resources: Vec<String>,
}

fn client_uuid_of(headers: &http::HeaderMap) -> ApiResult<ClientUuid> {
    headers
        .get("client-id")
        .and_then(|v| v.to_str().ok())
        .map(|v| ClientUuid::new(v.to_string()))
        .ok_or_else(|| ApiError::from(crate::service::ZephyrError::validation(
            "the Client-ID header is required",
        )))
}

async fn post_messages(
    State(state): State<AppState>,
    Path((project_id, queue_name)): Path<(String, String)>,
    headers: http::HeaderMap,
    Json(request): Json<PostMessagesRequest>,
) -> ApiResult<(StatusCode, Json<PostMessagesResponse>)> {
    let client_uuid = client_uuid_of(&headers)?;
    let mut specs = Vec::with_capacity(request.messages.len());
    for spec in request.messages {
        validate_message_ttl(spec.ttl).map_err(ApiError::from)?;
        validate_body_size(&spec.body).map_err(ApiError::from)?;
        specs.push(crate::service::MessageSpec {
            ttl_seconds: spec.ttl,
            body: spec.body,
        });
    }

    let ids = state
        .driver
        .post(
            &ProjectId::new(project_id.clone()),
            &QueueName::new(queue_name.clone()),
            &client_uuid,
            specs,
        )
        .await
        .map_err(ApiError::from)?;

    let resources = ids
        .iter()
        .map(|id| format!("/v1/{project_id}/queues/{queue_name}/messages/{id}"))
        .collect();
    Ok((StatusCode::CREATED, Json(PostMessagesResponse { resources })))
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesParams {
    marker: Option<String>,
    limit: Option<usize>,
    echo: Option<bool>,
    include_claimed: Option<bool>,
}

#[derive(Debug, Serialize)]
struct MessageView {
    id: String,
    href: String,
    ttl: u64,
    age: i64,
    body: Value,
}

fn message_view(project_id: &str, queue_name: &str, msg: &Message, now: chrono::DateTime<chrono::Utc>) -> MessageView {
    MessageView {
        id: msg.id.to_string(),
        href: format!("/v1/{project_id}/queues/{queue_name}/messages/{}", msg.id),
        ttl: msg.ttl_seconds,
        age: crate::utils::time::age_seconds(msg.created_at, now),
        body: msg.body.clone(),
    }
}

#[derive(Debug, Serialize)]
struct MessageListResponse {
    messages: Vec<MessageView>,
    links: Vec<super::queues::Link>,
}

async fn list_messages(
    State(state): State<AppState>,
    Path((project_id, queue_name)): Path<(String, String)>,
    Query(params): Query<ListMessagesParams>,
    headers: http::HeaderMap,
) -> ApiResult<Json<MessageListResponse>> {
    let client_uuid = headers
        .get("client-id")
        .and_then(|v| v.to_str().ok())
        .map(|v| ClientUuid::new(v.to_string()));

    let page = state
        .driver
        .list(
            &ProjectId::new(project_id.clone()),
            &QueueName::new(queue_name.clone()),
            ListMessagesQuery {
                marker: params.marker.map(Marker::opaque),
                limit: clamp_limit(params.limit),
                echo: params.echo.unwrap_or(false),
                include_claimed: params.include_claimed.unwrap_or(false),
                client_uuid,
            },
        )
        .await
        .map_err(ApiError::from)?;

    let now = chrono::Utc::now();
    let messages = page
        .items
        .iter()
        .map(|m| message_view(&project_id, &queue_name, m, now))
        .collect();
    let links = page
        .next_marker
        .map(|marker| {
            vec![super::queues::Link {
                rel: "next",
                href: format!(
                    "/v1/{project_id}/queues/{queue_name}/messages?marker={}",
                    marker.as_str()
                ),
            }]
        })
        .unwrap_or_default();

    Ok(Json(MessageListResponse { messages, links }))
}

async fn get_message(
    State(state): State<AppState>,
    Path((project_id, queue_name, message_id)): Path<(String, String, String)>,
) -> ApiResult<Json<Value>> {
    let msg_id = MsgId::parse(&message_id).ok_or_else(|| {
        ApiError::from(crate::service::ZephyrError::MessageDoesNotExist {
            queue: queue_name.clone(),
            msg_id: message_id.clone(),
        })
    })?;
    let msg = state
        .driver
        .get(&ProjectId::new(project_id.clone()), &QueueName::new(queue_name.clone()), msg_id)
        .await
        .map_err(ApiError::from)?;
    let now = chrono::Utc::now();
    Ok(Json(serde_json::to_value(message_view(&project_id, &queue_name, &msg, now)).unwrap()))
}

#[derive(Debug, Deserialize)]
pub struct DeleteMessageParams {
    claim_id: Option<String>,
}

async fn delete_message(
    State(state): State<AppState>,
    Path((project_id, queue_name, message_id)): Path<(String, String, String)>,
    Query(params): Query<DeleteMessageParams>,
) -> ApiResult<StatusCode> {
    let Some(msg_id) = MsgId::parse(&message_id) else {
        return Ok(StatusCode::NO_CONTENT);
    };
    let claim = params.claim_id.as_deref().and_then(ClaimId::parse);
    state
        .driver
        .delete(&ProjectId::new(project_id), &QueueName::new(queue_name), msg_id, claim)
        .await
        .map_err(ApiError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteParams {
    ids: String,
}

async fn bulk_delete_messages(
    State(state): State<AppState>,
    Path((project_id, queue_name)): Path<(String, String)>,
    Query(params): Query<BulkDeleteParams>,
) -> ApiResult<StatusCode> {
    let ids: Vec<MsgId> = params.ids.split(',').filter_map(MsgId::parse).collect();
    state
        .driver
        .bulk_delete(&ProjectId::new(project_id), &QueueName::new(queue_name), &ids)
        .await
        .map_err(ApiError::from)?;
    Ok(StatusCode::NO_CONTENT)
}
