use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::model::{week_start, DaySlots, WeeklyPlan};

/// Plan as sent by a client. Unlike stored plans, the slot list is not padded:
/// anything but seven days is rejected.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub week_start: Option<OffsetDateTime>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub slots: Vec<Option<DaySlots>>,
}

impl PlanInput {
    pub fn into_plan(self, now: OffsetDateTime) -> anyhow::Result<WeeklyPlan> {
        let created_at = self.created_at.unwrap_or(now);
        let plan = WeeklyPlan {
            id: self.id.filter(|id| !id.trim().is_empty()),
            created_at,
            week_start: self.week_start.unwrap_or_else(|| week_start(created_at)),
            name: self.name.filter(|n| !n.trim().is_empty()),
            categories: self.categories,
            slots: self.slots.into_iter().map(Option::unwrap_or_default).collect(),
        };
        plan.validate()?;
        Ok(plan)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub fill_empty_only: bool,
    /// Replaces the plan's category preferences before generating.
    #[serde(default)]
    pub categories: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub plan: WeeklyPlan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<WeeklyPlan> for PlanResponse {
    fn from(plan: WeeklyPlan) -> Self {
        Self {
            plan,
            generated: None,
            message: None,
        }
    }
}
