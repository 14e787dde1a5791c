use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use http::{header, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    error::{ApiError, ApiResult},
    validation::{validate_body_size, validate_claim_ttl, validate_grace},
    AppState,
};
use crate::service::{ClaimId, ClaimMeta, CreateClaimRequest, Message, ProjectId, QueueName};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/queues/{queue_name}/claims", post(create_claim))
        .route(
            "/queues/{queue_name}/claims/{claim_id}",
            get(get_claim).patch(update_claim).delete(delete_claim),
        )
}

#[derive(Debug, Deserialize)]
pub struct CreateClaimParams {
    ttl: u64,
    #[serde(default)]
    grace: u64,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Serialize)]
struct MessageView {
    id: String,
    href: String,
    ttl: u64,
    body: Value,
}

fn message_view(project_id: &str, queue_name: &str, claim_id: ClaimId, msg: &Message) -> MessageView {
    MessageView {
        id: msg.id.to_string(),
        href: format!(
            "/v1/{project_id}/queues/{queue_name}/messages/{}?claim_id={claim_id}",
            msg.id
        ),
        ttl: msg.ttl_seconds,
        body: msg.body.clone(),
    }
}

#[derive(Debug, Serialize)]
struct ClaimResponse {
    href: String,
    ttl: u64,
    grace: u64,
    messages: Vec<MessageView>,
}

async fn create_claim(
    State(state): State<AppState>,
    Path((project_id, queue_name)): Path<(String, String)>,
    body: axum::body::Bytes,
) -> ApiResult<Response> {
    let value: Value = serde_json::from_slice(&body).map_err(|e| {
        ApiError::from(crate::service::ZephyrError::validation(format!(
            "claim create body is not valid JSON: {e}"
        )))
    })?;
    validate_body_size(&value).map_err(ApiError::from)?;
    let params: CreateClaimParams = serde_json::from_value(value).map_err(|e| {
        ApiError::from(crate::service::ZephyrError::validation(format!(
            "claim create body is malformed: {e}"
        )))
    })?;
    validate_claim_ttl(params.ttl).map_err(ApiError::from)?;
    validate_grace(params.grace).map_err(ApiError::from)?;

    let (claim_id, messages) = state
        .driver
        .create(
            &ProjectId::new(project_id.clone()),
            &QueueName::new(queue_name.clone()),
            CreateClaimRequest {
                ttl_seconds: params.ttl,
                grace_seconds: params.grace,
                limit: params.limit,
            },
        )
        .await
        .map_err(ApiError::from)?;

    // `spec.md` §6.1: zero claimable messages is `204 No Content`, never an
    // empty `201`.
    if messages.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let views = messages
        .iter()
        .map(|m| message_view(&project_id, &queue_name, claim_id, m))
        .collect();
    let href = format!("/v1/{project_id}/queues/{queue_name}/claims/{claim_id}");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, href.clone())],
        Json(ClaimResponse {
            href,
            ttl: params.ttl,
            grace: params.grace,
            messages: views,
        }),
    )
        .into_response())
}

fn claim_response(
    project_id: &str,
    queue_name: &str,
    meta: &ClaimMeta,
    messages: &[Message],
) -> ClaimResponse {
    ClaimResponse {
        href: format!("/v1/{project_id}/queues/{queue_name}/claims/{}", meta.id),
        ttl: meta.ttl_seconds,
        grace: meta.grace_seconds,
        messages: messages
            .iter()
            .map(|m| message_view(project_id, queue_name, meta.id, m))
            .collect(),
    }
}

async fn get_claim(
    State(state): State<AppState>,
    Path((project_id, queue_name, claim_id)): Path<(String, String, String)>,
) -> ApiResult<Json<ClaimResponse>> {
    let claim_id = ClaimId::parse(&claim_id).ok_or_else(|| {
        ApiError::from(crate::service::ZephyrError::ClaimDoesNotExist {
            queue: queue_name.clone(),
            claim_id: claim_id.clone(),
        })
    })?;
    let (meta, messages) = state
        .driver
        .get(
            &ProjectId::new(project_id.clone()),
            &QueueName::new(queue_name.clone()),
            claim_id,
        )
        .await
        .map_err(ApiError::from)?;
    Ok(Json(claim_response(&project_id, &queue_name, &meta, &messages)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateClaimRequest {
    ttl: u64,
}

async fn update_claim(
    State(state): State<AppState>,
    Path((project_id, queue_name, claim_id)): Path<(String, String, String)>,
    body: axum::body::Bytes,
) -> ApiResult<StatusCode> {
    let value: Value = serde_json::from_slice(&body).map_err(|e| {
        ApiError::from(crate::service::ZephyrError::validation(format!(
            "claim update body is not valid JSON: {e}"
        )))
    })?;
    validate_body_size(&value).map_err(ApiError::from)?;
    let request: UpdateClaimRequest = serde_json::from_value(value).map_err(|e| {
        ApiError::from(crate::service::ZephyrError::validation(format!(
            "claim update body is malformed: {e}"
        )))
    })?;
    validate_claim_ttl(request.ttl).map_err(ApiError::from)?;

    let Some(claim_id) = ClaimId::parse(&claim_id) else {
        return Err(ApiError::from(crate::service::ZephyrError::ClaimDoesNotExist {
            queue: queue_name,
            claim_id,
        }));
    };
    state
        .driver
        .update(
            &ProjectId::new(project_id),
            &QueueName::new(queue_name),
            claim_id,
            request.ttl,
        )
        .await
        .map_err(ApiError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_claim(
    State(state): State<AppState>,
    Path((project_id, queue_name, claim_id)): Path<(String, String, String)>,
) -> ApiResult<StatusCode> {
    let Some(claim_id) = ClaimId::parse(&claim_id) else {
        return Ok(StatusCode::NO_CONTENT);
    };
    state
        .driver
        .delete(&ProjectId::new(project_id), &QueueName::new(queue_name), claim_id)
        .await
        .map_err(ApiError::from)?;
    Ok(StatusCode::NO_CONTENT)
}
