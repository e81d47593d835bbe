use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::{debug, instrument};

use crate::{auth::services::LocalSession, error::AppError, local::recent, state::AppState};

use super::aggregate;
use super::dto::{
    split_list, CategoryList, CategoryQuery, IngredientQuery, RandomQuery, RecipeList, SearchQuery,
    MAX_RANDOM,
};
use super::model::Recipe;

const NO_RECIPES: &str = "No recipes found";
const LOAD_FAILED: &str = "Failed to load recipes";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/recipes/random", get(random_recipes))
        .route("/recipes/search", get(search_recipes))
        .route("/recipes/by-category", get(recipes_by_category))
        .route("/recipes/by-ingredients", get(recipes_by_ingredients))
        .route("/recipes/:id", get(get_recipe))
        .route("/categories", get(list_categories))
}

/// GET /recipes/random?count=N
#[instrument(skip(state))]
pub async fn random_recipes(
    State(state): State<AppState>,
    Query(q): Query<RandomQuery>,
) -> Json<RecipeList> {
    let count = q.count.unwrap_or(1).clamp(1, MAX_RANDOM);
    let recipes = aggregate::many_random(state.recipes.as_ref(), count).await;
    Json(RecipeList::new(recipes, LOAD_FAILED))
}

/// GET /recipes/:id, remembered as a recent view for anonymous sessions.
#[instrument(skip(state, session))]
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    session: Option<LocalSession>,
) -> Result<Json<Recipe>, AppError> {
    let recipe = aggregate::recipe_by_id(state.recipes.as_ref(), &id)
        .await
        .ok_or_else(|| AppError::not_found("Recipe not found"))?;

    if let Some(s) = session {
        debug!(session = %s.id, recipe_id = %recipe.id, "recent view");
        let storage = state.sessions.get_or_create(&s.id);
        recent::add(storage.as_ref(), &recipe.id);
    }
    Ok(Json(recipe))
}

#[instrument(skip(state))]
pub async fn list_categories(State(state): State<AppState>) -> Json<CategoryList> {
    Json(CategoryList {
        categories: aggregate::categories(state.recipes.as_ref()).await,
    })
}

#[instrument(skip(state))]
pub async fn search_recipes(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> Json<RecipeList> {
    let recipes = aggregate::search(state.recipes.as_ref(), &q.q).await;
    Json(RecipeList::new(recipes, NO_RECIPES))
}

/// GET /recipes/by-category?categories=Beef,Dessert&per_category=N
///
/// No selected category means no recipes, without calling upstream.
#[instrument(skip(state))]
pub async fn recipes_by_category(
    State(state): State<AppState>,
    Query(q): Query<CategoryQuery>,
) -> Json<RecipeList> {
    let categories = split_list(&q.categories);
    if categories.is_empty() {
        return Json(RecipeList::new(Vec::new(), NO_RECIPES));
    }
    let per_category = q.per_category.unwrap_or(1).max(1);
    let recipes = aggregate::by_categories(state.recipes.as_ref(), &categories, per_category).await;
    Json(RecipeList::new(recipes, NO_RECIPES))
}

/// GET /recipes/by-ingredients?ingredients=egg,rice&match_all=true
#[instrument(skip(state))]
pub async fn recipes_by_ingredients(
    State(state): State<AppState>,
    Query(q): Query<IngredientQuery>,
) -> Json<RecipeList> {
    let ingredients = split_list(&q.ingredients);
    if ingredients.is_empty() {
        return Json(RecipeList::new(Vec::new(), NO_RECIPES));
    }
    let recipes = aggregate::by_ingredients(state.recipes.as_ref(), &ingredients, q.match_all).await;
    Json(RecipeList::new(recipes, NO_RECIPES))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::recipes::testing::{recipe, FakeSource};

    fn state_with(src: FakeSource) -> (AppState, Arc<FakeSource>) {
        let src = Arc::new(src);
        (AppState::fake_with(src.clone()), src)
    }

    #[tokio::test]
    async fn random_count_is_capped() {
        let (state, src) = state_with(FakeSource::default().with_random(vec![recipe("1")]));
        let Json(list) = random_recipes(State(state), Query(RandomQuery { count: Some(500) })).await;
        assert_eq!(list.recipes.len(), MAX_RANDOM);
        assert_eq!(src.calls(), MAX_RANDOM);
        assert!(list.message.is_none());
    }

    #[tokio::test]
    async fn random_failure_reports_message() {
        let (state, _) = state_with(FakeSource::default().failing("random"));
        let Json(list) = random_recipes(State(state), Query(RandomQuery { count: None })).await;
        assert!(list.recipes.is_empty());
        assert_eq!(list.message.as_deref(), Some(LOAD_FAILED));
    }

    #[tokio::test]
    async fn category_toggle_fetches_once_per_category() {
        let (state, src) = state_with(
            FakeSource::default()
                .with_category("Beef", vec![recipe("1"), recipe("2")])
                .with_category("Vegan", vec![recipe("3")]),
        );
        let q = CategoryQuery {
            categories: "Beef, Vegan".into(),
            per_category: Some(5),
        };
        let Json(list) = recipes_by_category(State(state.clone()), Query(q)).await;
        assert_eq!(src.calls(), 2);
        assert_eq!(list.recipes.len(), 3);

        let q = CategoryQuery {
            categories: "Vegan".into(),
            per_category: None,
        };
        let Json(list) = recipes_by_category(State(state), Query(q)).await;
        assert_eq!(src.calls(), 3);
        assert_eq!(list.recipes[0].id, "3");
    }

    #[tokio::test]
    async fn empty_ingredient_results_carry_message() {
        let (state, _) = state_with(FakeSource::default());
        let q = IngredientQuery {
            ingredients: "saffron".into(),
            match_all: true,
        };
        let Json(list) = recipes_by_ingredients(State(state), Query(q)).await;
        assert_eq!(list.message.as_deref(), Some(NO_RECIPES));
    }

    #[tokio::test]
    async fn blank_selections_skip_upstream() {
        let (state, src) = state_with(
            FakeSource::default()
                .with_category("Beef", vec![recipe("1")])
                .with_random(vec![recipe("2")]),
        );

        let q = IngredientQuery {
            ingredients: " , ".into(),
            match_all: false,
        };
        let Json(list) = recipes_by_ingredients(State(state.clone()), Query(q)).await;
        assert!(list.recipes.is_empty());
        assert_eq!(list.message.as_deref(), Some(NO_RECIPES));

        let q = CategoryQuery {
            categories: String::new(),
            per_category: Some(3),
        };
        let Json(list) = recipes_by_category(State(state), Query(q)).await;
        assert!(list.recipes.is_empty());
        assert_eq!(list.message.as_deref(), Some(NO_RECIPES));
        assert_eq!(src.calls(), 0);
    }

    #[tokio::test]
    async fn lookup_records_recent_view_for_sessions() {
        let (state, _) = state_with(FakeSource::default().with_details(recipe("52772")));
        let session = LocalSession {
            id: "session-xyz".into(),
            storage: state.sessions.get_or_create("session-xyz"),
        };
        let Json(r) = get_recipe(State(state.clone()), Path("52772".into()), Some(session))
            .await
            .unwrap();
        assert_eq!(r.id, "52772");
        let storage = state.sessions.get("session-xyz").unwrap();
        assert_eq!(recent::list(storage.as_ref()), vec!["52772".to_string()]);

        let err = get_recipe(State(state), Path("0".into()), None).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "Recipe not found"));
    }
}
