use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use tokio::time::Instant;
use tracing::{debug, info};

use super::MemoryStorage;

/// Header naming the anonymous session whose local storage a request uses.
pub const SESSION_HEADER: &str = "x-boxbite-session";

pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

pub fn is_valid_session_id(id: &str) -> bool {
    lazy_static! {
        static ref SESSION_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]{8,128}$").unwrap();
    }
    SESSION_RE.is_match(id)
}

struct Entry {
    storage: Arc<MemoryStorage>,
    last_seen: Instant,
}

/// Local storage of every anonymous session, held in process memory.
///
/// Sessions untouched for `idle_ttl` are dropped, and creating a session
/// beyond `max_sessions` drops the least recently used one.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Entry>>,
    idle_ttl: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TTL, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new(idle_ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    /// Existing, unexpired session; never creates one.
    pub fn get(&self, id: &str) -> Option<Arc<MemoryStorage>> {
        self.get_at(id, Instant::now())
    }

    fn get_at(&self, id: &str, now: Instant) -> Option<Arc<MemoryStorage>> {
        let mut sessions = self.sessions();
        let expired = sessions
            .get(id)
            .map_or(false, |e| now.saturating_duration_since(e.last_seen) >= self.idle_ttl);
        if expired {
            sessions.remove(id);
            return None;
        }
        let entry = sessions.get_mut(id)?;
        entry.last_seen = now;
        Some(entry.storage.clone())
    }

    pub fn get_or_create(&self, id: &str) -> Arc<MemoryStorage> {
        self.get_or_create_at(id, Instant::now())
    }

    fn get_or_create_at(&self, id: &str, now: Instant) -> Arc<MemoryStorage> {
        if let Some(s) = self.get_at(id, now) {
            return s;
        }
        let mut sessions = self.sessions();
        if sessions.len() >= self.max_sessions {
            Self::drop_expired(&mut sessions, now, self.idle_ttl);
        }
        if sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, e)| e.last_seen)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                debug!(session = %oldest, "session cap reached, dropping least recent");
                sessions.remove(&oldest);
            }
        }
        sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                debug!(session = id, "new local session");
                Entry {
                    storage: Arc::new(MemoryStorage::default()),
                    last_seen: now,
                }
            })
            .storage
            .clone()
    }

    fn drop_expired(sessions: &mut HashMap<String, Entry>, now: Instant, ttl: Duration) -> usize {
        let before = sessions.len();
        sessions.retain(|_, e| now.saturating_duration_since(e.last_seen) < ttl);
        before - sessions.len()
    }

    /// Removes every session idle for longer than the TTL.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    fn sweep_at(&self, now: Instant) -> usize {
        Self::drop_expired(&mut self.sessions(), now, self.idle_ttl)
    }

    /// Drops everything stored for the session.
    pub fn evict(&self, id: &str) -> bool {
        self.sessions().remove(id).is_some()
    }
}

/// Periodically sweeps idle sessions for the life of the process.
pub fn spawn_sweeper(store: Arc<SessionStore>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let removed = store.sweep();
            if removed > 0 {
                info!(removed, remaining = store.len(), "idle sessions swept");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalStorage;

    #[test]
    fn validates_session_ids() {
        assert!(is_valid_session_id("abcDEF12-_"));
        assert!(!is_valid_session_id("short"));
        assert!(!is_valid_session_id("has space in it"));
        assert!(!is_valid_session_id(&"x".repeat(129)));
    }

    #[test]
    fn sessions_are_isolated_and_evictable() {
        let store = SessionStore::default();
        store.get_or_create("session-a").set_item("k", "1".into());
        assert_eq!(store.get_or_create("session-a").get_item("k").as_deref(), Some("1"));
        assert!(store.get_or_create("session-b").get_item("k").is_none());

        assert!(store.evict("session-a"));
        assert!(store.get("session-a").is_none());
        assert!(!store.evict("session-a"));
    }

    #[test]
    fn get_never_creates() {
        let store = SessionStore::default();
        assert!(store.get("session-ghost").is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn idle_sessions_expire() {
        let store = SessionStore::new(Duration::from_secs(60), 100);
        let start = Instant::now();
        store.get_or_create_at("session-old", start);
        store.get_or_create_at("session-busy", start);

        let later = start + Duration::from_secs(45);
        assert!(store.get_at("session-busy", later).is_some());

        let past_ttl = start + Duration::from_secs(61);
        assert!(store.get_at("session-old", past_ttl).is_none());
        assert_eq!(store.sweep_at(past_ttl), 0);
        assert_eq!(store.len(), 1);

        assert_eq!(store.sweep_at(later + Duration::from_secs(60)), 1);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn one_off_ids_stay_within_the_cap() {
        let store = SessionStore::new(Duration::from_secs(3600), 50);
        let start = Instant::now();
        for i in 0..10_000u64 {
            store.get_or_create_at(&format!("visitor-{i:06}"), start + Duration::from_millis(i));
        }
        assert_eq!(store.len(), 50);
        assert!(store.get("visitor-009999").is_some());
        assert!(store.get("visitor-000000").is_none());
    }
}
