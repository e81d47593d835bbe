//! Filling a plan's slots with recipes from the catalogue.

use rand::seq::SliceRandom;
use tracing::{debug, instrument};

use crate::recipes::{aggregate, client::RecipeSource, model::Recipe};

use super::model::{MealType, WeeklyPlan, DAYS_PER_WEEK};

pub const ALL_FILLED: &str = "All slots are filled!";
pub const SLOT_FAILED: &str = "Failed to generate recipe for this slot.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekOutcome {
    pub generated: usize,
    pub message: String,
}

/// Every (day, meal) pair in day order, or only the empty ones.
pub fn slots_to_fill(plan: &WeeklyPlan, fill_empty_only: bool) -> Vec<(usize, MealType)> {
    (0..DAYS_PER_WEEK)
        .flat_map(|day| MealType::ALL.into_iter().map(move |meal| (day, meal)))
        .filter(|&(day, meal)| {
            !fill_empty_only || plan.slots.get(day).map_or(true, |d| d.get(meal).is_none())
        })
        .collect()
}

/// Recipes for `needed` slots. With preferences, each category contributes
/// up to `ceil(needed / categories)` picks, topped up with random recipes
/// when that falls short.
async fn pick_recipes(src: &dyn RecipeSource, categories: &[String], needed: usize) -> Vec<Recipe> {
    if categories.is_empty() {
        return aggregate::many_random(src, needed).await;
    }

    let per_category = needed.div_ceil(categories.len());
    let mut recipes = aggregate::by_categories(src, categories, per_category).await;
    if recipes.len() < needed {
        let extra = aggregate::many_random(src, needed - recipes.len()).await;
        recipes.extend(extra);
    } else {
        recipes.shuffle(&mut rand::thread_rng());
    }
    recipes.truncate(needed);
    recipes
}

#[instrument(skip(src, plan), fields(categories = plan.categories.len()))]
pub async fn generate_week(
    src: &dyn RecipeSource,
    plan: &mut WeeklyPlan,
    fill_empty_only: bool,
) -> WeekOutcome {
    let targets = slots_to_fill(plan, fill_empty_only);
    if targets.is_empty() {
        return WeekOutcome {
            generated: 0,
            message: ALL_FILLED.to_string(),
        };
    }

    let recipes = pick_recipes(src, &plan.categories, targets.len()).await;
    let generated = recipes.len();
    for ((day, meal), recipe) in targets.into_iter().zip(recipes) {
        if let Some(slots) = plan.slots.get_mut(day) {
            slots.set(meal, Some(recipe));
        }
    }
    debug!(generated, "week generated");

    let scope = if fill_empty_only { "empty slots" } else { "the week" };
    let plural = if generated == 1 { "" } else { "s" };
    WeekOutcome {
        generated,
        message: format!("Generated {generated} recipe{plural} for {scope}."),
    }
}

/// One recipe for a single slot: a random pick from a random preferred
/// category (fetched in full), else any random recipe.
#[instrument(skip(src))]
pub async fn generate_slot(src: &dyn RecipeSource, categories: &[String]) -> Option<Recipe> {
    let category = categories.choose(&mut rand::thread_rng()).cloned();
    if let Some(category) = category {
        let candidates = aggregate::by_category(src, &category).await;
        let pick = candidates.choose(&mut rand::thread_rng()).map(|r| r.id.clone());
        if let Some(id) = pick {
            if let Some(recipe) = aggregate::recipe_by_id(src, &id).await {
                return Some(recipe);
            }
        }
    }
    aggregate::random_recipe(src).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::testing::{recipe, FakeSource};
    use time::macros::datetime;

    fn plan(categories: &[&str]) -> WeeklyPlan {
        let mut p = WeeklyPlan::new_for(datetime!(2024-05-15 10:00 UTC));
        p.categories = categories.iter().map(|c| c.to_string()).collect();
        p
    }

    fn many(prefix: &str, n: usize) -> Vec<Recipe> {
        (0..n).map(|i| recipe(&format!("{prefix}{i}"))).collect()
    }

    #[tokio::test]
    async fn fills_all_21_slots_from_random_without_preferences() {
        let src = FakeSource::default().with_random(many("r", 30));
        let mut p = plan(&[]);
        let out = generate_week(&src, &mut p, false).await;
        assert_eq!(out.generated, 21);
        assert_eq!(out.message, "Generated 21 recipes for the week.");
        assert!(p.slots.iter().all(|d| d.breakfast.is_some() && d.lunch.is_some() && d.dinner.is_some()));
    }

    #[tokio::test]
    async fn category_shortfall_is_topped_up_with_random() {
        let src = FakeSource::default()
            .with_category("Beef", many("b", 3))
            .with_category("Vegan", many("v", 2))
            .with_random(many("r", 40));
        let mut p = plan(&["Beef", "Vegan"]);
        let out = generate_week(&src, &mut p, false).await;
        assert_eq!(out.generated, 21);
        assert_eq!(p.slots[0].breakfast.as_ref().unwrap().category.as_deref(), Some("Beef"));
        assert!(p.slots[6].dinner.as_ref().unwrap().id.starts_with('r'));
    }

    #[tokio::test]
    async fn fill_empty_only_keeps_existing_recipes() {
        let src = FakeSource::default().with_category("Dessert", many("d", 50));
        let mut p = plan(&["Dessert"]);
        p.slots[2].lunch = Some(recipe("keep"));
        let out = generate_week(&src, &mut p, true).await;
        assert_eq!(out.generated, 20);
        assert_eq!(out.message, "Generated 20 recipes for empty slots.");
        assert_eq!(p.slots[2].lunch.as_ref().unwrap().id, "keep");

        let again = generate_week(&src, &mut p, true).await;
        assert_eq!(again, WeekOutcome { generated: 0, message: ALL_FILLED.into() });
    }

    #[tokio::test]
    async fn slot_prefers_full_details_from_a_preferred_category() {
        let mut detailed = recipe("b1");
        detailed.instructions = Some("Sear.".into());
        let src = FakeSource::default()
            .with_category("Beef", vec![recipe("b1")])
            .with_details(detailed)
            .with_random(vec![recipe("r1")]);
        let got = generate_slot(&src, &["Beef".to_string()]).await.unwrap();
        assert_eq!(got.instructions.as_deref(), Some("Sear."));
    }

    #[tokio::test]
    async fn slot_falls_back_to_random() {
        let src = FakeSource::default()
            .with_category("Beef", vec![recipe("b1")])
            .failing("lookup")
            .with_random(vec![recipe("r1")]);
        assert_eq!(generate_slot(&src, &["Beef".to_string()]).await.unwrap().id, "r1");

        let empty = FakeSource::default();
        assert!(generate_slot(&empty, &[]).await.is_none());
    }
}
