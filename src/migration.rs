//! One-shot copy of an anonymous session's local data into a user's hosted
//! collections.
//!
//! A marker document (`meta/migration`) records that the copy happened. The
//! copy only ever adds documents the user does not have yet, so repeating it
//! never duplicates or overwrites anything. Failures are logged and
//! swallowed: signing in must keep working when the copy does not.
//!
//! Each collection is copied on its own. A collection that cannot be read
//! does not stop the others, but it leaves the marker unwritten so the next
//! sign-in tries again. A single document that fails to write only counts as
//! skipped.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Context;
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::auth::services::{AuthUser, LocalSession};
use crate::documents::{Collection, DocumentStore};
use crate::error::AppError;
use crate::local::{
    self, read_json, read_records, LocalStorage, MemoryStorage, CURRENT_PLAN_KEY, FAVORITES_KEY,
    FAVORITES_LEGACY_KEY, PLANS_KEY, PLANS_LEGACY_KEY,
};
use crate::plans::model::{LegacyPlanV1, WeeklyPlan};
use crate::recipes::model::Recipe;
use crate::state::AppState;

pub const MARKER_ID: &str = "migration";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CopyCounts {
    pub migrated: usize,
    pub skipped: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub already_migrated: bool,
    pub favorites: CopyCounts,
    pub plans: CopyCounts,
    /// Collections whose copy failed as a whole; empty once the marker is written.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<&'static str>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct Marker {
    #[serde(default, with = "time::serde::rfc3339::option")]
    migrated_at: Option<OffsetDateTime>,
    #[serde(default)]
    favorites_migrated: usize,
    #[serde(default)]
    plans_migrated: usize,
}

/// Legacy key first; the current key only when the legacy one yields nothing.
fn local_favorites(store: &dyn LocalStorage) -> Vec<Recipe> {
    let legacy: Vec<Recipe> = read_records(store, FAVORITES_LEGACY_KEY);
    if !legacy.is_empty() {
        return legacy;
    }
    read_records(store, FAVORITES_KEY)
}

/// Current-schema plans, else the converted legacy ones, plus the working
/// plan when it has been saved under an id not already listed.
fn local_plans(store: &dyn LocalStorage) -> Vec<WeeklyPlan> {
    let mut plans: Vec<WeeklyPlan> = read_records(store, PLANS_KEY);
    if plans.is_empty() {
        plans = read_records::<LegacyPlanV1>(store, PLANS_LEGACY_KEY)
            .into_iter()
            .filter_map(LegacyPlanV1::into_current)
            .collect();
    }

    if let Some(current) = read_json::<WeeklyPlan>(store, CURRENT_PLAN_KEY) {
        if current.id.is_some() && !plans.iter().any(|p| p.id == current.id) {
            plans.push(current);
        }
    }
    plans
}

async fn existing_ids(
    docs: &dyn DocumentStore,
    user_id: Uuid,
    collection: Collection,
) -> anyhow::Result<HashSet<String>> {
    Ok(docs
        .list(user_id, collection)
        .await?
        .into_iter()
        .map(|d| d.id)
        .collect())
}

async fn copy_missing(
    docs: &dyn DocumentStore,
    user_id: Uuid,
    collection: Collection,
    items: Vec<(String, anyhow::Result<Value>)>,
) -> anyhow::Result<CopyCounts> {
    let mut existing = existing_ids(docs, user_id, collection).await?;
    let mut counts = CopyCounts::default();

    for (id, body) in items {
        if existing.contains(&id) {
            counts.skipped += 1;
            continue;
        }
        let written = match body {
            Ok(body) => docs.put(user_id, collection, &id, body).await,
            Err(e) => Err(e),
        };
        match written {
            Ok(()) => {
                existing.insert(id);
                counts.migrated += 1;
            }
            Err(e) => {
                warn!(error = %e, %user_id, collection = collection.as_str(), id = %id, "document copy failed");
                counts.skipped += 1;
            }
        }
    }
    Ok(counts)
}

pub async fn migrate_favorites(
    docs: &dyn DocumentStore,
    user_id: Uuid,
    store: &dyn LocalStorage,
) -> anyhow::Result<CopyCounts> {
    let favorites = local_favorites(store);
    if favorites.is_empty() {
        return Ok(CopyCounts::default());
    }
    let items = favorites
        .into_iter()
        .filter(|r| !r.id.trim().is_empty())
        .map(|r| {
            let body = serde_json::to_value(&r).context("encode favorite");
            (r.id, body)
        })
        .collect();
    copy_missing(docs, user_id, Collection::Favorites, items).await
}

pub async fn migrate_weekly_plans(
    docs: &dyn DocumentStore,
    user_id: Uuid,
    store: &dyn LocalStorage,
) -> anyhow::Result<CopyCounts> {
    let plans = local_plans(store);
    if plans.is_empty() {
        return Ok(CopyCounts::default());
    }
    let items = plans
        .into_iter()
        .filter_map(|p| {
            let id = p.id.clone()?;
            let body = serde_json::to_value(&p).context("encode plan");
            Some((id, body))
        })
        .collect();
    copy_missing(docs, user_id, Collection::WeeklyPlans, items).await
}

async fn run(
    docs: &dyn DocumentStore,
    user_id: Uuid,
    store: &dyn LocalStorage,
) -> anyhow::Result<MigrationReport> {
    let marker = docs
        .get(user_id, Collection::Meta, MARKER_ID)
        .await?
        .and_then(|v| serde_json::from_value::<Marker>(v).ok());
    if marker.map_or(false, |m| m.migrated_at.is_some()) {
        return Ok(MigrationReport {
            already_migrated: true,
            ..Default::default()
        });
    }

    let mut failed = Vec::new();
    let mut settle = |collection: Collection, result: anyhow::Result<CopyCounts>| match result {
        Ok(counts) => counts,
        Err(e) => {
            warn!(error = %e, %user_id, collection = collection.as_str(), "collection not migrated");
            failed.push(collection.as_str());
            CopyCounts::default()
        }
    };
    let favorites = settle(
        Collection::Favorites,
        migrate_favorites(docs, user_id, store).await,
    );
    let plans = settle(
        Collection::WeeklyPlans,
        migrate_weekly_plans(docs, user_id, store).await,
    );

    if !failed.is_empty() {
        return Ok(MigrationReport {
            already_migrated: false,
            favorites,
            plans,
            failed,
        });
    }

    let marker = Marker {
        migrated_at: Some(OffsetDateTime::now_utc()),
        favorites_migrated: favorites.migrated,
        plans_migrated: plans.migrated,
    };
    docs.put(user_id, Collection::Meta, MARKER_ID, json!(marker))
        .await
        .context("write migration marker")?;

    Ok(MigrationReport {
        already_migrated: false,
        favorites,
        plans,
        failed,
    })
}

/// Runs the copy unless the marker says it already happened. Never fails:
/// errors are logged and reported as `None`.
#[instrument(skip(docs, store))]
pub async fn perform_migration_if_needed(
    docs: &dyn DocumentStore,
    user_id: Uuid,
    store: &dyn LocalStorage,
) -> Option<MigrationReport> {
    match run(docs, user_id, store).await {
        Ok(report) => {
            if !report.already_migrated {
                info!(
                    %user_id,
                    favorites = report.favorites.migrated,
                    plans = report.plans.migrated,
                    "local data migrated"
                );
            }
            Some(report)
        }
        Err(e) => {
            error!(error = %e, %user_id, "migration failed");
            None
        }
    }
}

/// Fire-and-forget migration used right after sign-in.
pub fn spawn_migration(docs: Arc<dyn DocumentStore>, user_id: Uuid, store: Arc<MemoryStorage>) {
    tokio::spawn(async move {
        perform_migration_if_needed(docs.as_ref(), user_id, store.as_ref()).await;
    });
}

#[derive(Debug, Default, Deserialize)]
pub struct MigrateRequest {
    /// Raw key/value dump of the client's local storage.
    #[serde(default)]
    pub entries: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize)]
pub struct MigrateResponse {
    pub completed: bool,
    #[serde(flatten)]
    pub report: MigrationReport,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/me/migrate", post(migrate))
}

/// POST /me/migrate: copies an uploaded snapshot, or the caller's session.
#[instrument(skip(state, session, body))]
pub async fn migrate(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    session: Option<LocalSession>,
    body: Option<Json<MigrateRequest>>,
) -> Result<Json<MigrateResponse>, AppError> {
    let uploaded = body.and_then(|Json(b)| b.entries);
    let store: Arc<MemoryStorage> = match (uploaded, session) {
        (Some(entries), _) => Arc::new(MemoryStorage::from_snapshot(entries)),
        (None, Some(s)) => s.storage,
        (None, None) => {
            return Err(AppError::bad_request(format!(
                "send local storage entries or a {} header",
                local::SESSION_HEADER
            )))
        }
    };

    let report = perform_migration_if_needed(state.documents.as_ref(), user_id, store.as_ref()).await;
    Ok(Json(MigrateResponse {
        completed: report.is_some(),
        report: report.unwrap_or_default(),
    }))
}
