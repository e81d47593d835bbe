use super::{read_records, write_json, LocalStorage, FAVORITES_KEY};
use crate::recipes::model::Recipe;

pub fn list(store: &dyn LocalStorage) -> Vec<Recipe> {
    read_records(store, FAVORITES_KEY)
}

/// Appends the recipe unless one with the same id is already saved.
pub fn add(store: &dyn LocalStorage, recipe: &Recipe) -> bool {
    let mut existing = list(store);
    if existing.iter().any(|r| r.id == recipe.id) {
        return false;
    }
    existing.push(recipe.clone());
    write_json(store, FAVORITES_KEY, &existing);
    true
}

pub fn remove(store: &dyn LocalStorage, id: &str) -> bool {
    let existing = list(store);
    let before = existing.len();
    let kept: Vec<Recipe> = existing.into_iter().filter(|r| r.id != id).collect();
    let removed = kept.len() != before;
    write_json(store, FAVORITES_KEY, &kept);
    removed
}
