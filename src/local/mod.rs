//! Client-side ("local storage") persistence for visitors who are not signed in.
//!
//! Values are JSON strings under flat keys, exactly what a browser client
//! keeps, so a client can upload its dump and have it read here unchanged.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::warn;

pub mod favorites;
mod handlers;
pub mod page_state;
pub mod plans;
pub mod recent;
mod sessions;

pub use sessions::{is_valid_session_id, spawn_sweeper, SessionStore, SESSION_HEADER};

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}

pub const FAVORITES_KEY: &str = "boxbite_favorites";
pub const FAVORITES_LEGACY_KEY: &str = "boxbite_favorites_v1";
pub const RECENT_KEY: &str = "boxbite_recent";
pub const PLANS_KEY: &str = "boxbite_weekly_plans_v2";
pub const PLANS_LEGACY_KEY: &str = "boxbite_weekly_plans_v1";
pub const CURRENT_PLAN_KEY: &str = "boxbite_current_plan_v2";

/// Synchronous string key/value store. No cross-key atomicity; last write wins.
pub trait LocalStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: String);
    fn remove_item(&self, key: &str);
    fn clear(&self);
    fn snapshot(&self) -> HashMap<String, String>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn from_snapshot(items: HashMap<String, String>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    fn items(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: String) {
        self.items().insert(key.to_string(), value);
    }

    fn remove_item(&self, key: &str) {
        self.items().remove(key);
    }

    fn clear(&self) {
        self.items().clear();
    }

    fn snapshot(&self) -> HashMap<String, String> {
        self.items().clone()
    }
}

/// Missing keys and unparseable values both read as `None`.
pub fn read_json<T: DeserializeOwned>(store: &dyn LocalStorage, key: &str) -> Option<T> {
    let raw = store.get_item(key)?;
    match serde_json::from_str(&raw) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(key, error = %e, "unreadable local value");
            None
        }
    }
}

/// Reads a JSON array, dropping elements that do not parse as `T`.
pub fn read_records<T: DeserializeOwned>(store: &dyn LocalStorage, key: &str) -> Vec<T> {
    read_json::<Vec<Value>>(store, key)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect()
}

pub fn write_json<T: Serialize + ?Sized>(store: &dyn LocalStorage, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(s) => store.set_item(key, s),
        Err(e) => warn!(key, error = %e, "failed to encode local value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparseable_values_read_as_absent() {
        let store = MemoryStorage::default();
        store.set_item("k", "{not json".into());
        assert_eq!(read_json::<Value>(&store, "k"), None);
        assert!(read_records::<Value>(&store, "k").is_empty());
        assert_eq!(read_json::<Value>(&store, "missing"), None);
    }

    #[test]
    fn records_skip_bad_elements() {
        let store = MemoryStorage::default();
        store.set_item("k", r#"[1, "two", 3]"#.into());
        assert_eq!(read_records::<u32>(&store, "k"), vec![1, 3]);
    }

    #[test]
    fn snapshot_round_trips_and_clear_evicts() {
        let store = MemoryStorage::from_snapshot(HashMap::from([("a".into(), "1".into())]));
        write_json(&store, "b", &[1, 2]);
        let snap = store.snapshot();
        assert_eq!(snap.get("b").map(String::as_str), Some("[1,2]"));
        store.clear();
        assert!(store.snapshot().is_empty());
    }
}
