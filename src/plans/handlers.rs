use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{debug, info, instrument};

use crate::{auth::services::Owner, error::AppError, state::AppState};

use super::dto::{GenerateRequest, PlanInput, PlanResponse};
use super::generate::{self, SLOT_FAILED};
use super::model::{MealType, WeeklyPlan, DAYS_PER_WEEK};
use super::services;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans).post(create_plan))
        .route("/plans/current", get(get_current).put(put_current))
        .route("/plans/current/generate", post(generate_week))
        .route(
            "/plans/current/slots/:day/:meal",
            post(generate_slot).delete(clear_slot),
        )
        .route("/plans/:id", put(update_plan).delete(delete_plan))
}

fn parse_input(input: PlanInput) -> Result<WeeklyPlan, AppError> {
    input
        .into_plan(OffsetDateTime::now_utc())
        .map_err(|e| AppError::bad_request(e.to_string()))
}

fn parse_slot(day: usize, meal: &str) -> Result<(usize, MealType), AppError> {
    if day >= DAYS_PER_WEEK {
        return Err(AppError::bad_request(format!(
            "day must be between 0 and {}",
            DAYS_PER_WEEK - 1
        )));
    }
    let meal = meal
        .parse::<MealType>()
        .map_err(|e| AppError::bad_request(e.to_string()))?;
    Ok((day, meal))
}

#[instrument(skip(state, owner))]
pub async fn list_plans(
    State(state): State<AppState>,
    owner: Owner,
) -> Result<Json<Vec<WeeklyPlan>>, AppError> {
    Ok(Json(services::list(state.documents.as_ref(), &owner).await?))
}

/// POST /plans: saves a plan (new id unless one is given) and makes it current.
#[instrument(skip(state, owner, input))]
pub async fn create_plan(
    State(state): State<AppState>,
    owner: Owner,
    Json(input): Json<PlanInput>,
) -> Result<(StatusCode, Json<WeeklyPlan>), AppError> {
    let plan = parse_input(input)?;
    let saved = services::save(state.documents.as_ref(), &owner, plan).await?;
    services::set_current(state.documents.as_ref(), &owner, &saved).await?;
    info!(plan_id = ?saved.id, "plan created");
    Ok((StatusCode::CREATED, Json(saved)))
}

#[instrument(skip(state, owner, input))]
pub async fn update_plan(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
    Json(input): Json<PlanInput>,
) -> Result<Json<WeeklyPlan>, AppError> {
    let mut plan = parse_input(input)?;
    plan.id = Some(id);
    let saved = services::save(state.documents.as_ref(), &owner, plan).await?;
    Ok(Json(saved))
}

#[instrument(skip(state, owner))]
pub async fn delete_plan(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if services::delete(state.documents.as_ref(), &owner, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Plan not found"))
    }
}

#[instrument(skip(state, owner))]
pub async fn get_current(
    State(state): State<AppState>,
    owner: Owner,
) -> Result<Json<WeeklyPlan>, AppError> {
    let plan = services::current(state.documents.as_ref(), &owner, OffsetDateTime::now_utc()).await?;
    Ok(Json(plan))
}

#[instrument(skip(state, owner, input))]
pub async fn put_current(
    State(state): State<AppState>,
    owner: Owner,
    Json(input): Json<PlanInput>,
) -> Result<Json<WeeklyPlan>, AppError> {
    let plan = parse_input(input)?;
    services::set_current(state.documents.as_ref(), &owner, &plan).await?;
    debug!(plan_id = ?plan.id, has_recipes = plan.has_any_recipe(), "current plan replaced");
    Ok(Json(plan))
}

/// POST /plans/current/generate `{ "fill_empty_only": bool, "categories"?: [..] }`
#[instrument(skip(state, owner, body))]
pub async fn generate_week(
    State(state): State<AppState>,
    owner: Owner,
    body: Option<Json<GenerateRequest>>,
) -> Result<Json<PlanResponse>, AppError> {
    let req = body.map(|Json(b)| b).unwrap_or_default();
    let docs = state.documents.as_ref();

    let mut plan = services::current(docs, &owner, OffsetDateTime::now_utc()).await?;
    if let Some(categories) = req.categories {
        plan.categories = categories;
    }
    let outcome = generate::generate_week(state.recipes.as_ref(), &mut plan, req.fill_empty_only).await;
    services::set_current(docs, &owner, &plan).await?;

    Ok(Json(PlanResponse {
        plan,
        generated: Some(outcome.generated),
        message: Some(outcome.message),
    }))
}

#[instrument(skip(state, owner))]
pub async fn generate_slot(
    State(state): State<AppState>,
    owner: Owner,
    Path((day, meal)): Path<(usize, String)>,
) -> Result<Json<PlanResponse>, AppError> {
    let (day, meal) = parse_slot(day, &meal)?;
    let docs = state.documents.as_ref();
    let mut plan = services::current(docs, &owner, OffsetDateTime::now_utc()).await?;

    let Some(recipe) = generate::generate_slot(state.recipes.as_ref(), &plan.categories).await else {
        return Ok(Json(PlanResponse {
            plan,
            generated: Some(0),
            message: Some(SLOT_FAILED.to_string()),
        }));
    };
    plan.slots[day].set(meal, Some(recipe));
    services::set_current(docs, &owner, &plan).await?;

    Ok(Json(PlanResponse {
        generated: Some(1),
        ..plan.into()
    }))
}

#[instrument(skip(state, owner))]
pub async fn clear_slot(
    State(state): State<AppState>,
    owner: Owner,
    Path((day, meal)): Path<(usize, String)>,
) -> Result<Json<PlanResponse>, AppError> {
    let (day, meal) = parse_slot(day, &meal)?;
    let docs = state.documents.as_ref();
    let mut plan = services::current(docs, &owner, OffsetDateTime::now_utc()).await?;
    plan.slots[day].set(meal, None);
    services::set_current(docs, &owner, &plan).await?;
    Ok(Json(plan.into()))
}
