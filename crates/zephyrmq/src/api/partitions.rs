//! `spec.md` §4.4 — operator-level partition registry, not project-scoped.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use http::StatusCode;
use serde::{Deserialize, Serialize};

use super::{
    error::{ApiError, ApiResult},
    AppState,
};
use crate::service::Partition;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_partition).get(list_partitions))
        .route("/select", get(select_partition))
        .route("/{name}", get(get_partition).delete(delete_partition))
}

#[derive(Debug, Deserialize)]
pub struct CreatePartitionRequest {
    name: String,
    weight: u32,
    nodes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PartitionResponse {
    name: String,
    weight: u32,
    nodes: Vec<String>,
}

impl From<Partition> for PartitionResponse {
    fn from(p: Partition) -> Self {
        Self {
            name: p.name,
            weight: p.weight,
            nodes: p.nodes,
        }
    }
}

async fn create_partition(
    State(state): State<AppState>,
    Json(request): Json<CreatePartitionRequest>,
) -> ApiResult<StatusCode> {
    state
        .proxy
        .create(&request.name, request.weight, request.nodes)
        .await
        .map_err(ApiError::from)?;
    Ok(StatusCode::CREATED)
}

async fn list_partitions(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<PartitionResponse>>> {
    let partitions = state.proxy.list().await.map_err(ApiError::from)?;
    Ok(Json(partitions.into_iter().map(Into::into).collect()))
}

async fn get_partition(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<PartitionResponse>> {
    let partition = state.proxy.get(&name).await.map_err(ApiError::from)?;
    Ok(Json(partition.into()))
}

async fn delete_partition(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    state.proxy.delete(&name).await.map_err(ApiError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct SelectedNode {
    node: String,
}

async fn select_partition(State(state): State<AppState>) -> ApiResult<Json<SelectedNode>> {
    let node = state.proxy.select().await.map_err(ApiError::from)?;
    Ok(Json(SelectedNode { node }))
}
