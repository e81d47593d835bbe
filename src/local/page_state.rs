//! Ad hoc per-page UI state (form values, selections) and scroll offsets.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use super::{read_json, write_json, LocalStorage};

pub fn is_valid_page_name(name: &str) -> bool {
    lazy_static! {
        static ref PAGE_RE: Regex = Regex::new(r"^[a-z0-9_-]{1,64}$").unwrap();
    }
    PAGE_RE.is_match(name)
}

fn state_key(page: &str) -> String {
    format!("boxbite_page_{page}")
}

fn scroll_key(page: &str) -> String {
    format!("{}_scroll", state_key(page))
}

pub fn get(store: &dyn LocalStorage, page: &str) -> Option<Value> {
    read_json(store, &state_key(page))
}

pub fn set(store: &dyn LocalStorage, page: &str, value: &Value) {
    write_json(store, &state_key(page), value);
}

pub fn scroll(store: &dyn LocalStorage, page: &str) -> Option<u64> {
    store.get_item(&scroll_key(page))?.trim().parse().ok()
}

pub fn set_scroll(store: &dyn LocalStorage, page: &str, offset: u64) {
    store.set_item(&scroll_key(page), offset.to_string());
}
