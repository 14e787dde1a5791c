use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    error::{ApiError, ApiResult},
    validation::{clamp_limit, validate_name, NameKind},
    AppState,
};
use crate::service::{ListQueuesQuery, Marker, ProjectId, QueueName};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/queues",
            get(list_queues),
        )
        .route(
            "/queues/{queue_name}",
            put(create_queue).get(get_queue).delete(delete_queue),
        )
        .route(
            "/queues/{queue_name}/metadata",
            get(get_metadata).put(set_metadata),
        )
        .route("/queues/{queue_name}/stats", get(get_stats))
}

#[derive(Debug, Deserialize)]
pub struct ListQueuesParams {
    marker: Option<String>,
    limit: Option<usize>,
    detailed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct QueueListItem {
    name: String,
    href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<HashMap<String, Value>>,
}

#[derive(Debug, Serialize)]
pub struct QueueListResponse {
    queues: Vec<QueueListItem>,
    links: Vec<Link>,
}

#[derive(Debug, Serialize)]
pub struct Link {
    pub rel: &'static str,
    pub href: String,
}

async fn list_queues(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(params): Query<ListQueuesParams>,
) -> ApiResult<Json<QueueListResponse>> {
    let project = ProjectId::new(project_id.clone());
    let page = state
        .driver
        .list(
            &project,
            ListQueuesQuery {
                marker: params.marker.map(Marker::for_queue_name),
                limit: clamp_limit(params.limit),
                detailed: params.detailed.unwrap_or(false),
            },
        )
        .await
        .map_err(ApiError::from)?;

    let queues = page
        .items
        .into_iter()
        .map(|record| QueueListItem {
            href: format!("/v1/{project_id}/queues/{}", record.name.as_str()),
            name: record.name.as_str().to_string(),
            metadata: record.metadata,
        })
        .collect();

    let links = page
        .next_marker
        .map(|marker| {
            vec![Link {
                rel: "next",
                href: format!(
                    "/v1/{project_id}/queues?marker={}",
                    urlencode(marker.as_str())
                ),
            }]
        })
        .unwrap_or_default();

    Ok(Json(QueueListResponse { queues, links }))
}

async fn create_queue(
    State(state): State<AppState>,
    Path((project_id, queue_name)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    validate_name(NameKind::Project, &project_id)?;
    validate_name(NameKind::Queue, &queue_name)?;
    let created = state
        .driver
        .create(&ProjectId::new(project_id), &QueueName::new(queue_name))
        .await
        .map_err(ApiError::from)?;
    Ok(if created {
        StatusCode::CREATED
    } else {
        StatusCode::NO_CONTENT
    })
}

async fn get_queue(
    State(state): State<AppState>,
    Path((project_id, queue_name)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let exists = state
        .driver
        .exists(&ProjectId::new(project_id), &QueueName::new(queue_name))
        .await
        .map_err(ApiError::from)?;
    Ok(if exists {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    })
}

async fn delete_queue(
    State(state): State<AppState>,
    Path((project_id, queue_name)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state
        .driver
        .delete(&ProjectId::new(project_id), &QueueName::new(queue_name))
        .await
        .map_err(ApiError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_metadata(
    State(state): State<AppState>,
    Path((project_id, queue_name)): Path<(String, String)>,
) -> ApiResult<Json<HashMap<String, Value>>> {
    let metadata = state
        .driver
        .get_metadata(&ProjectId::new(project_id), &QueueName::new(queue_name))
        .await
        .map_err(ApiError::from)?;
    Ok(Json(metadata))
}

async fn set_metadata(
    State(state): State<AppState>,
    Path((project_id, queue_name)): Path<(String, String)>,
    Json(metadata): Json<HashMap<String, Value>>,
) -> ApiResult<StatusCode> {
    state
        .driver
        .set_metadata(
            &ProjectId::new(project_id),
            &QueueName::new(queue_name),
            metadata,
        )
        .await
        .map_err(ApiError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_stats(
    State(state): State<AppState>,
    Path((project_id, queue_name)): Path<(String, String)>,
) -> ApiResult<Json<crate::service::QueueStats>> {
    let stats = state
        .driver
        .stats(&ProjectId::new(project_id), &QueueName::new(queue_name))
        .await
        .map_err(ApiError::from)?;
    Ok(Json(stats))
}

fn urlencode(value: &str) -> String {
    percent_encoding::utf8_percent_encode(value, percent_encoding::NON_ALPHANUMERIC).to_string()
}
