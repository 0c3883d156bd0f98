use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use serde_json::{Value, json};

use super::ApiError;
use crate::dispatcher::{CompareRequest, dispatch};
use crate::state::AppState;
use crate::status;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Lenient body parsing: a missing, empty or non-JSON body reads as `null`,
/// which every endpoint reports as "No data provided".
fn json_body(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

/// Run filesystem work on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(ApiError::internal)?
}

pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(status::server_info(&state))
}

pub async fn health(State(state): State<AppState>) -> Json<status::Health> {
    Json(status::health(&state))
}

pub async fn compare(State(state): State<AppState>, body: Bytes) -> ApiResult<Value> {
    let request = CompareRequest::parse(&json_body(&body))?;
    let similarity = dispatch(&state, request).await?;
    Ok(Json(json!({ "similarity": similarity })))
}

pub async fn leaderboard_get(
    State(state): State<AppState>,
    Path(quest_id): Path<String>,
) -> ApiResult<Value> {
    let store = state.leaderboard.clone();
    let id = quest_id.clone();
    let entries = blocking(move || Ok(store.entries(&id))).await?;
    Ok(Json(json!({ "quest_id": quest_id, "leaderboard": entries })))
}

pub async fn leaderboard_add(
    State(state): State<AppState>,
    Path(quest_id): Path<String>,
    body: Bytes,
) -> ApiResult<Value> {
    let store = state.leaderboard.clone();
    let body = json_body(&body);
    blocking(move || store.add(&quest_id, &body).map_err(ApiError::from)).await?;
    Ok(Json(json!({ "message": "Leaderboard entry added successfully" })))
}

pub async fn submit_quest(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<quest_store::SubmitReceipt> {
    let catalog = state.catalog.clone();
    let body = json_body(&body);
    let receipt = blocking(move || catalog.submit(&body).map_err(ApiError::from)).await?;
    Ok(Json(receipt))
}

pub async fn list_quests(State(state): State<AppState>) -> ApiResult<Vec<quest_store::QuestSummary>> {
    let catalog = state.catalog.clone();
    let quests = blocking(move || catalog.list().map_err(ApiError::from)).await?;
    Ok(Json(quests))
}

pub async fn get_quest(
    State(state): State<AppState>,
    Path(quest_id): Path<String>,
) -> ApiResult<quest_store::QuestDocument> {
    let catalog = state.catalog.clone();
    let doc = blocking(move || catalog.find(&quest_id).map_err(ApiError::from)).await?;
    Ok(Json(doc))
}

pub async fn rate_quest(
    State(state): State<AppState>,
    Path(quest_id): Path<String>,
    body: Bytes,
) -> ApiResult<quest_store::RatingReceipt> {
    let catalog = state.catalog.clone();
    let body = json_body(&body);
    let receipt = blocking(move || catalog.rate(&quest_id, &body).map_err(ApiError::from)).await?;
    Ok(Json(receipt))
}

pub async fn submitted_quests(
    State(state): State<AppState>,
) -> ApiResult<Vec<quest_store::SubmittedQuest>> {
    let catalog = state.catalog.clone();
    let quests = blocking(move || catalog.submitted().map_err(ApiError::from)).await?;
    Ok(Json(quests))
}
