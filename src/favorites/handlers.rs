use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde_json::Value;
use tracing::{info, instrument};

use crate::{auth::services::Owner, error::AppError, recipes::model::Recipe, state::AppState};

use super::services;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/favorites", get(list_favorites))
        .route("/favorites/:id", put(save_favorite).delete(remove_favorite))
}

#[instrument(skip(state, owner))]
pub async fn list_favorites(
    State(state): State<AppState>,
    owner: Owner,
) -> Result<Json<Vec<Recipe>>, AppError> {
    let recipes = services::list(state.documents.as_ref(), &owner).await?;
    Ok(Json(recipes))
}

/// PUT /favorites/:id with the recipe as body. The path id is authoritative,
/// so the body may leave `id` out.
#[instrument(skip(state, owner, body))]
pub async fn save_favorite(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Recipe>, AppError> {
    if id.trim().is_empty() {
        return Err(AppError::bad_request("recipe id is required"));
    }
    let Value::Object(mut fields) = body else {
        return Err(AppError::bad_request("recipe must be a JSON object"));
    };
    fields.insert("id".into(), Value::String(id));
    let recipe: Recipe = serde_json::from_value(Value::Object(fields))
        .map_err(|e| AppError::bad_request(format!("invalid recipe: {e}")))?;

    let added = services::save(state.documents.as_ref(), &owner, &recipe).await?;
    info!(recipe_id = %recipe.id, added, "favorite saved");
    Ok(Json(recipe))
}

#[instrument(skip(state, owner))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if services::remove(state.documents.as_ref(), &owner, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Favorite not found"))
    }
}
