use serde::{Deserialize, Serialize};

use super::model::Recipe;

pub const MAX_RANDOM: usize = 24;

#[derive(Debug, Deserialize)]
pub struct RandomQuery {
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// `categories` is a comma separated list.
#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    #[serde(default)]
    pub categories: String,
    pub per_category: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct IngredientQuery {
    #[serde(default)]
    pub ingredients: String,
    #[serde(default)]
    pub match_all: bool,
}

#[derive(Debug, Serialize)]
pub struct RecipeList {
    pub recipes: Vec<Recipe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RecipeList {
    pub fn new(recipes: Vec<Recipe>, empty_message: &str) -> Self {
        let message = recipes.is_empty().then(|| empty_message.to_string());
        Self { recipes, message }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryList {
    pub categories: Vec<String>,
}

pub fn split_list(raw: &str) -> Vec<&str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
}
