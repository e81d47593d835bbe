//! Saved plans and the working ("current") plan for either kind of owner.
//!
//! Signed-in users keep saved plans in the `weekly_plans` collection and the
//! working plan in `meta/current_plan`. Sessions use local storage keys.

use anyhow::Context;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::debug;

use crate::auth::services::Owner;
use crate::documents::{Collection, DocumentStore};
use crate::favorites::services::decode_documents;
use crate::local::plans as local;

use super::model::{default_plan_name, new_plan_id, WeeklyPlan};

pub const CURRENT_PLAN_ID: &str = "current_plan";

fn encode(plan: &WeeklyPlan) -> anyhow::Result<Value> {
    serde_json::to_value(plan).context("encode plan")
}

/// Saved plans, newest first.
pub async fn list(docs: &dyn DocumentStore, owner: &Owner) -> anyhow::Result<Vec<WeeklyPlan>> {
    match owner {
        Owner::User(user_id) => {
            let mut plans: Vec<WeeklyPlan> =
                decode_documents(docs.list(*user_id, Collection::WeeklyPlans).await?);
            plans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(plans)
        }
        Owner::Session(storage) => Ok(local::list(storage.as_ref())),
    }
}

/// Assigns an id and a default name when missing, then stores the plan.
pub async fn save(
    docs: &dyn DocumentStore,
    owner: &Owner,
    mut plan: WeeklyPlan,
) -> anyhow::Result<WeeklyPlan> {
    let id = plan.id.clone().unwrap_or_else(new_plan_id);
    plan.id = Some(id.clone());
    if plan.name.is_none() {
        plan.name = Some(default_plan_name(plan.week_start));
    }

    match owner {
        Owner::User(user_id) => {
            docs.put(*user_id, Collection::WeeklyPlans, &id, encode(&plan)?)
                .await?;
        }
        Owner::Session(storage) => {
            local::save(storage.as_ref(), plan.clone());
        }
    }
    debug!(plan_id = %id, "plan saved");
    Ok(plan)
}

pub async fn delete(docs: &dyn DocumentStore, owner: &Owner, id: &str) -> anyhow::Result<bool> {
    match owner {
        Owner::User(user_id) => docs.delete(*user_id, Collection::WeeklyPlans, id).await,
        Owner::Session(storage) => Ok(local::delete(storage.as_ref(), id)),
    }
}

/// The working plan. A user without one continues their most recent saved
/// plan; otherwise a new empty plan for this week is created and stored.
pub async fn current(
    docs: &dyn DocumentStore,
    owner: &Owner,
    now: OffsetDateTime,
) -> anyhow::Result<WeeklyPlan> {
    let user_id = match owner {
        Owner::User(user_id) => *user_id,
        Owner::Session(storage) => return Ok(local::current_or_new(storage.as_ref(), now)),
    };

    let stored = docs.get(user_id, Collection::Meta, CURRENT_PLAN_ID).await?;
    if let Some(plan) = stored.and_then(|v| serde_json::from_value::<WeeklyPlan>(v).ok()) {
        return Ok(plan);
    }

    let plan = match list(docs, owner).await?.into_iter().next() {
        Some(latest) => latest,
        None => WeeklyPlan::new_for(now),
    };
    docs.put(user_id, Collection::Meta, CURRENT_PLAN_ID, encode(&plan)?)
        .await?;
    Ok(plan)
}

/// Replaces the working plan. For a user, a plan that was already saved is
/// written back to the saved list too.
pub async fn set_current(
    docs: &dyn DocumentStore,
    owner: &Owner,
    plan: &WeeklyPlan,
) -> anyhow::Result<()> {
    match owner {
        Owner::User(user_id) => {
            let body = encode(plan)?;
            if let Some(id) = plan.id.as_deref() {
                docs.put(*user_id, Collection::WeeklyPlans, id, body.clone())
                    .await?;
            }
            docs.put(*user_id, Collection::Meta, CURRENT_PLAN_ID, body)
                .await
        }
        Owner::Session(storage) => {
            local::set_current(storage.as_ref(), plan);
            Ok(())
        }
    }
}
