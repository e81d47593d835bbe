use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{format_description::well_known::Rfc3339, macros::format_description, Duration, OffsetDateTime};
use uuid::Uuid;

use crate::recipes::model::Recipe;

pub const DAYS_PER_WEEK: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealType {
    pub const ALL: [MealType; 3] = [MealType::Breakfast, MealType::Lunch, MealType::Dinner];
}

impl FromStr for MealType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            other => anyhow::bail!("unknown meal type: {other}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DaySlots {
    #[serde(default)]
    pub breakfast: Option<Recipe>,
    #[serde(default)]
    pub lunch: Option<Recipe>,
    #[serde(default)]
    pub dinner: Option<Recipe>,
}

impl DaySlots {
    pub fn get(&self, meal: MealType) -> Option<&Recipe> {
        match meal {
            MealType::Breakfast => self.breakfast.as_ref(),
            MealType::Lunch => self.lunch.as_ref(),
            MealType::Dinner => self.dinner.as_ref(),
        }
    }

    pub fn set(&mut self, meal: MealType, recipe: Option<Recipe>) {
        let slot = match meal {
            MealType::Breakfast => &mut self.breakfast,
            MealType::Lunch => &mut self.lunch,
            MealType::Dinner => &mut self.dinner,
        };
        *slot = recipe;
    }
}

pub fn empty_slots() -> Vec<DaySlots> {
    vec![DaySlots::default(); DAYS_PER_WEEK]
}

/// Monday 00:00 UTC of the week containing `ts`.
pub fn week_start(ts: OffsetDateTime) -> OffsetDateTime {
    let date = ts.to_offset(time::UtcOffset::UTC).date();
    let back = date.weekday().number_days_from_monday() as i64;
    (date - Duration::days(back)).midnight().assume_utc()
}

pub fn new_plan_id() -> String {
    Uuid::new_v4().to_string()
}

/// "Week of Jan 5" style label used when a plan is saved without a name.
pub fn default_plan_name(week_start: OffsetDateTime) -> String {
    let fmt = format_description!("[month repr:short] [day padding:none]");
    match week_start.format(&fmt) {
        Ok(s) => format!("Week of {s}"),
        Err(_) => "Weekly plan".to_string(),
    }
}

fn parse_ts(raw: Option<&str>) -> Option<OffsetDateTime> {
    raw.and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok())
}

fn normalize_slots(mut slots: Vec<DaySlots>) -> Vec<DaySlots> {
    slots.resize(DAYS_PER_WEEK, DaySlots::default());
    slots
}

/// Seven days of breakfast/lunch/dinner. `id` stays empty until the plan is
/// saved to the plan list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredPlan")]
pub struct WeeklyPlan {
    pub id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub week_start: OffsetDateTime,
    pub name: Option<String>,
    pub categories: Vec<String>,
    pub slots: Vec<DaySlots>,
}

impl WeeklyPlan {
    /// Empty plan for the week containing `now`.
    pub fn new_for(now: OffsetDateTime) -> Self {
        Self {
            id: None,
            created_at: now,
            week_start: week_start(now),
            name: None,
            categories: Vec::new(),
            slots: empty_slots(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.slots.len() == DAYS_PER_WEEK,
            "slots must contain exactly {} entries",
            DAYS_PER_WEEK
        );
        Ok(())
    }

    pub fn has_any_recipe(&self) -> bool {
        self.slots
            .iter()
            .any(|d| MealType::ALL.iter().any(|m| d.get(*m).is_some()))
    }
}

/// Plan as persisted by any client version: timestamps may be missing or
/// malformed and the slot list may have the wrong length.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredPlan {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    week_start: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    categories: Option<Vec<String>>,
    #[serde(default)]
    slots: Option<Vec<Option<DaySlots>>>,
}

impl From<StoredPlan> for WeeklyPlan {
    fn from(s: StoredPlan) -> Self {
        let created_at = parse_ts(s.created_at.as_deref()).unwrap_or_else(OffsetDateTime::now_utc);
        let week_start = parse_ts(s.week_start.as_deref()).unwrap_or_else(|| week_start(created_at));
        let slots = s
            .slots
            .unwrap_or_default()
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect();
        Self {
            id: s.id.filter(|id| !id.trim().is_empty()),
            created_at,
            week_start,
            name: s.name.filter(|n| !n.trim().is_empty()),
            categories: s.categories.unwrap_or_default(),
            slots: normalize_slots(slots),
        }
    }
}

/// First-generation plan: one recipe per day and a single category.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyPlanV1 {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub recipes: Option<Vec<Value>>,
}

impl LegacyPlanV1 {
    /// Each day's recipe becomes its lunch. Plans without a recipe list are dropped.
    pub fn into_current(self) -> Option<WeeklyPlan> {
        let recipes = self.recipes?;
        let slots = recipes
            .into_iter()
            .map(|v| DaySlots {
                breakfast: None,
                lunch: serde_json::from_value::<Recipe>(v).ok(),
                dinner: None,
            })
            .collect();
        let created_at = parse_ts(self.created_at.as_deref()).unwrap_or_else(OffsetDateTime::now_utc);

        Some(WeeklyPlan {
            id: Some(self.id.filter(|id| !id.trim().is_empty()).unwrap_or_else(new_plan_id)),
            created_at,
            week_start: week_start(created_at),
            name: self.name.filter(|n| !n.trim().is_empty()),
            categories: self.category.into_iter().filter(|c| !c.is_empty()).collect(),
            slots: normalize_slots(slots),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn week_starts_on_monday_midnight_utc() {
        assert_eq!(week_start(datetime!(2024-05-15 17:30 UTC)), datetime!(2024-05-13 0:00 UTC));
        // Sunday belongs to the week that began six days earlier.
        assert_eq!(week_start(datetime!(2024-05-19 23:59 UTC)), datetime!(2024-05-13 0:00 UTC));
        assert_eq!(week_start(datetime!(2024-05-13 0:00 UTC)), datetime!(2024-05-13 0:00 UTC));
        assert_eq!(week_start(datetime!(2024-05-20 1:00 +3)), datetime!(2024-05-13 0:00 UTC));
    }

    #[test]
    fn default_name_uses_short_month() {
        assert_eq!(default_plan_name(datetime!(2024-01-05 0:00 UTC)), "Week of Jan 5");
    }

    #[test]
    fn stored_plan_is_normalized() {
        let plan: WeeklyPlan = serde_json::from_value(json!({
            "id": "",
            "createdAt": "2024-05-15T10:00:00.000Z",
            "slots": [{ "lunch": { "id": "1", "name": "Soup" } }, null],
        }))
        .unwrap();
        assert_eq!(plan.id, None);
        assert_eq!(plan.week_start, datetime!(2024-05-13 0:00 UTC));
        assert_eq!(plan.slots.len(), DAYS_PER_WEEK);
        assert_eq!(plan.slots[0].get(MealType::Lunch).unwrap().id, "1");
        assert!(plan.validate().is_ok());
        assert!(plan.has_any_recipe());
    }

    #[test]
    fn serializes_camel_case() {
        let plan = WeeklyPlan::new_for(datetime!(2024-05-15 10:00 UTC));
        let v = serde_json::to_value(&plan).unwrap();
        assert_eq!(v["weekStart"], "2024-05-13T00:00:00Z");
        assert_eq!(v["slots"].as_array().unwrap().len(), 7);
        assert!(v["slots"][0]["breakfast"].is_null());
        assert!(!plan.has_any_recipe());
    }

    #[test]
    fn legacy_plan_moves_recipes_to_lunch() {
        let legacy: LegacyPlanV1 = serde_json::from_value(json!({
            "id": "1700000000000",
            "createdAt": "2024-05-16T08:00:00Z",
            "category": "Seafood",
            "recipes": [{ "id": "10", "name": "Fish pie" }, null, { "name": "no id" }],
        }))
        .unwrap();
        let plan = legacy.into_current().expect("has recipes");
        assert_eq!(plan.id.as_deref(), Some("1700000000000"));
        assert_eq!(plan.categories, vec!["Seafood"]);
        assert_eq!(plan.week_start, datetime!(2024-05-13 0:00 UTC));
        assert_eq!(plan.slots.len(), DAYS_PER_WEEK);
        assert_eq!(plan.slots[0].lunch.as_ref().unwrap().id, "10");
        assert!(plan.slots[0].breakfast.is_none());
        assert!(plan.slots[2].lunch.is_none());
    }

    #[test]
    fn legacy_plan_without_recipes_is_dropped() {
        let legacy: LegacyPlanV1 = serde_json::from_value(json!({ "id": "x" })).unwrap();
        assert!(legacy.into_current().is_none());
    }

    #[test]
    fn meal_type_parses_case_insensitively() {
        assert_eq!("Dinner".parse::<MealType>().unwrap(), MealType::Dinner);
        assert!("brunch".parse::<MealType>().is_err());
    }
}
