use super::{read_records, write_json, LocalStorage, RECENT_KEY};

pub const MAX_RECENT: usize = 10;

/// Recently viewed recipe ids, newest first.
pub fn list(store: &dyn LocalStorage) -> Vec<String> {
    read_records(store, RECENT_KEY)
}

pub fn add(store: &dyn LocalStorage, recipe_id: &str) {
    let mut ids: Vec<String> = list(store).into_iter().filter(|id| id != recipe_id).collect();
    ids.insert(0, recipe_id.to_string());
    ids.truncate(MAX_RECENT);
    write_json(store, RECENT_KEY, &ids);
}

pub fn clear(store: &dyn LocalStorage) {
    store.remove_item(RECENT_KEY);
}
