//! Catalogue queries as the rest of the service sees them.
//!
//! Each function fans out to the upstream source and collapses failures into
//! empty results: a failed call is logged and contributes nothing, the
//! aggregate still returns whatever the other calls produced.

use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use rand::seq::SliceRandom;
use tracing::{instrument, warn};

use super::client::RecipeSource;
use super::model::Recipe;

fn or_empty<T: Default>(op: &str, key: &str, res: anyhow::Result<T>) -> T {
    match res {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, op, key, "upstream call failed");
            T::default()
        }
    }
}

fn dedup_by_id(recipes: impl IntoIterator<Item = Recipe>) -> Vec<Recipe> {
    let mut seen = HashSet::new();
    recipes
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .collect()
}

/// Trims, drops blanks and removes case-insensitive duplicates, keeping order.
fn distinct_terms<S: AsRef<str>>(terms: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    terms
        .iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .map(String::from)
        .collect()
}

pub async fn random_recipe(src: &dyn RecipeSource) -> Option<Recipe> {
    or_empty("random", "", src.random().await)
}

pub async fn recipe_by_id(src: &dyn RecipeSource, id: &str) -> Option<Recipe> {
    if id.trim().is_empty() {
        return None;
    }
    or_empty("lookup", id, src.lookup(id.trim()).await)
}

pub async fn categories(src: &dyn RecipeSource) -> Vec<String> {
    or_empty("categories", "", src.categories().await)
}

pub async fn search(src: &dyn RecipeSource, query: &str) -> Vec<Recipe> {
    let q = query.trim();
    if q.is_empty() {
        return Vec::new();
    }
    or_empty("search", q, src.search(q).await)
}

pub async fn by_category(src: &dyn RecipeSource, category: &str) -> Vec<Recipe> {
    let c = category.trim();
    if c.is_empty() || c.eq_ignore_ascii_case("all") {
        return Vec::new();
    }
    or_empty("filter_by_category", c, src.filter_by_category(c).await)
}

pub async fn by_ingredient(src: &dyn RecipeSource, ingredient: &str) -> Vec<Recipe> {
    let i = ingredient.trim();
    if i.is_empty() {
        return Vec::new();
    }
    or_empty("filter_by_ingredient", i, src.filter_by_ingredient(i).await)
}

/// `count` independent random picks issued in parallel; duplicates are possible.
#[instrument(skip(src))]
pub async fn many_random(src: &dyn RecipeSource, count: usize) -> Vec<Recipe> {
    let calls = (0..count).map(|_| random_recipe(src));
    join_all(calls).await.into_iter().flatten().collect()
}

/// One upstream request per category, up to `per_category` shuffled picks from
/// each, flattened in category order and deduplicated by id.
#[instrument(skip(src))]
pub async fn by_categories<S: AsRef<str> + std::fmt::Debug>(
    src: &dyn RecipeSource,
    categories: &[S],
    per_category: usize,
) -> Vec<Recipe> {
    let cats = distinct_terms(categories);
    let results = join_all(cats.iter().map(|c| by_category(src, c))).await;

    let picked = results.into_iter().flat_map(|mut recipes| {
        recipes.shuffle(&mut rand::thread_rng());
        recipes.truncate(per_category);
        recipes
    });
    dedup_by_id(picked)
}

/// One upstream request per ingredient. With `match_all`, only recipes found
/// for every ingredient survive (first source's order); otherwise the union.
#[instrument(skip(src))]
pub async fn by_ingredients<S: AsRef<str> + std::fmt::Debug>(
    src: &dyn RecipeSource,
    ingredients: &[S],
    match_all: bool,
) -> Vec<Recipe> {
    let terms = distinct_terms(ingredients);
    if terms.is_empty() {
        return Vec::new();
    }
    let results = join_all(terms.iter().map(|i| by_ingredient(src, i))).await;

    if !match_all {
        return dedup_by_id(results.into_iter().flatten());
    }

    let mut hits: HashMap<String, usize> = HashMap::new();
    for source in &results {
        let ids: HashSet<&str> = source.iter().map(|r| r.id.as_str()).collect();
        for id in ids {
            *hits.entry(id.to_string()).or_default() += 1;
        }
    }
    let needed = terms.len();
    let first = results.into_iter().next().unwrap_or_default();
    dedup_by_id(
        first
            .into_iter()
            .filter(|r| hits.get(&r.id).copied() == Some(needed)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::testing::{recipe, FakeSource};

    #[tokio::test]
    async fn blank_inputs_skip_upstream() {
        let src = FakeSource::default();
        assert!(search(&src, "  ").await.is_empty());
        assert!(by_category(&src, "all").await.is_empty());
        assert!(by_ingredient(&src, "").await.is_empty());
        assert!(by_ingredients::<&str>(&src, &[], true).await.is_empty());
        assert_eq!(src.calls(), 0);
    }

    #[tokio::test]
    async fn categories_fan_out_once_per_category() {
        let src = FakeSource::default()
            .with_category("Beef", vec![recipe("1"), recipe("2"), recipe("3")])
            .with_category("Dessert", vec![recipe("4")]);

        let out = by_categories(&src, &["Beef", "Dessert", "beef"], 2).await;
        assert_eq!(src.calls(), 2);
        assert_eq!(out.len(), 3);
        assert_eq!(out.last().unwrap().id, "4");
        assert!(out.iter().all(|r| r.category.is_some()));
    }

    #[tokio::test]
    async fn failing_category_yields_partial_result() {
        let src = FakeSource::default()
            .with_category("Beef", vec![recipe("1")])
            .failing("Pork");
        let out = by_categories(&src, &["Pork", "Beef"], 5).await;
        assert_eq!(out.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), ["1"]);
    }

    #[tokio::test]
    async fn match_all_keeps_recipes_found_for_every_ingredient() {
        let src = FakeSource::default()
            .with_ingredient("chicken", vec![recipe("1"), recipe("2"), recipe("3")])
            .with_ingredient("rice", vec![recipe("3"), recipe("1")])
            .with_ingredient("garlic", vec![recipe("1"), recipe("3"), recipe("9")]);

        let all = by_ingredients(&src, &["chicken", "rice", "garlic", " Rice "], true).await;
        assert_eq!(all.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), ["1", "3"]);
        assert_eq!(src.calls(), 3);

        let any = by_ingredients(&src, &["chicken", "garlic"], false).await;
        assert_eq!(
            any.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            ["1", "2", "3", "9"]
        );
    }

    #[tokio::test]
    async fn match_all_with_failed_source_is_empty() {
        let src = FakeSource::default()
            .with_ingredient("chicken", vec![recipe("1")])
            .failing("rice");
        assert!(by_ingredients(&src, &["chicken", "rice"], true).await.is_empty());
    }

    #[tokio::test]
    async fn many_random_drops_failures() {
        let src = FakeSource::default().with_random(vec![recipe("7")]);
        assert_eq!(many_random(&src, 4).await.len(), 4);

        let empty = FakeSource::default().failing("random");
        assert!(many_random(&empty, 3).await.is_empty());
    }
}
