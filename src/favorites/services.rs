//! Favorites for either kind of owner. Signed-in users keep one document per
//! recipe (document id = recipe id); anonymous sessions keep a JSON array in
//! local storage.

use serde_json::Value;
use tracing::warn;

use crate::auth::services::Owner;
use crate::documents::{Collection, Document, DocumentStore};
use crate::local::favorites as local;
use crate::recipes::model::Recipe;

/// Bodies that no longer parse as a recipe are skipped.
pub(crate) fn decode_documents<T: serde::de::DeserializeOwned>(docs: Vec<Document>) -> Vec<T> {
    docs.into_iter()
        .filter_map(|Document { id, body }| match serde_json::from_value(body) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(error = %e, id = %id, "skipping unreadable document");
                None
            }
        })
        .collect()
}

pub async fn list(docs: &dyn DocumentStore, owner: &Owner) -> anyhow::Result<Vec<Recipe>> {
    match owner {
        Owner::User(user_id) => {
            let found = docs.list(*user_id, Collection::Favorites).await?;
            Ok(decode_documents(found))
        }
        Owner::Session(storage) => Ok(local::list(storage.as_ref())),
    }
}

/// Stores the recipe under its id. Returns false when a session already had it.
pub async fn save(docs: &dyn DocumentStore, owner: &Owner, recipe: &Recipe) -> anyhow::Result<bool> {
    anyhow::ensure!(!recipe.id.trim().is_empty(), "recipe id is required");
    match owner {
        Owner::User(user_id) => {
            let body: Value = serde_json::to_value(recipe)?;
            docs.put(*user_id, Collection::Favorites, &recipe.id, body).await?;
            Ok(true)
        }
        Owner::Session(storage) => Ok(local::add(storage.as_ref(), recipe)),
    }
}

pub async fn remove(docs: &dyn DocumentStore, owner: &Owner, id: &str) -> anyhow::Result<bool> {
    match owner {
        Owner::User(user_id) => docs.delete(*user_id, Collection::Favorites, id).await,
        Owner::Session(storage) => Ok(local::remove(storage.as_ref(), id)),
    }
}
