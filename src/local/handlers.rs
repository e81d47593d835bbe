use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use crate::{auth::services::LocalSession, error::AppError, state::AppState};

use super::{page_state, recent};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/session", delete(clear_session))
        .route("/session/recent", get(list_recent).delete(clear_recent))
        .route("/session/state/:name", get(get_page_state).put(put_page_state))
        .route("/session/state/:name/scroll", get(get_scroll).put(put_scroll))
}

#[derive(Debug, Serialize)]
pub struct RecentList {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScrollOffset {
    pub offset: u64,
}

fn page_name(name: &str) -> Result<&str, AppError> {
    if page_state::is_valid_page_name(name) {
        Ok(name)
    } else {
        Err(AppError::bad_request("invalid page name"))
    }
}

/// Wipes the session's local storage.
#[instrument(skip(state, session))]
pub async fn clear_session(State(state): State<AppState>, session: LocalSession) -> StatusCode {
    state.sessions.evict(&session.id);
    info!(session = %session.id, "session cleared");
    StatusCode::NO_CONTENT
}

#[instrument(skip(session))]
pub async fn list_recent(session: LocalSession) -> Json<RecentList> {
    Json(RecentList {
        ids: recent::list(session.storage.as_ref()),
    })
}

#[instrument(skip(session))]
pub async fn clear_recent(session: LocalSession) -> StatusCode {
    recent::clear(session.storage.as_ref());
    StatusCode::NO_CONTENT
}

#[instrument(skip(session))]
pub async fn get_page_state(
    session: LocalSession,
    Path(name): Path<String>,
) -> Result<Json<Value>, AppError> {
    let name = page_name(&name)?;
    page_state::get(session.storage.as_ref(), name)
        .map(Json)
        .ok_or_else(|| AppError::not_found("No saved state"))
}

#[instrument(skip(session, value))]
pub async fn put_page_state(
    session: LocalSession,
    Path(name): Path<String>,
    Json(value): Json<Value>,
) -> Result<StatusCode, AppError> {
    let name = page_name(&name)?;
    page_state::set(session.storage.as_ref(), name, &value);
    Ok(StatusCode::NO_CONTENT)
}

/// Missing offsets read as zero.
#[instrument(skip(session))]
pub async fn get_scroll(
    session: LocalSession,
    Path(name): Path<String>,
) -> Result<Json<ScrollOffset>, AppError> {
    let name = page_name(&name)?;
    let offset = page_state::scroll(session.storage.as_ref(), name).unwrap_or(0);
    Ok(Json(ScrollOffset { offset }))
}

#[instrument(skip(session))]
pub async fn put_scroll(
    session: LocalSession,
    Path(name): Path<String>,
    Json(body): Json<ScrollOffset>,
) -> Result<StatusCode, AppError> {
    let name = page_name(&name)?;
    page_state::set_scroll(session.storage.as_ref(), name, body.offset);
    Ok(StatusCode::NO_CONTENT)
}
