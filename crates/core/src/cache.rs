//! Client-side snapshot cache.
//!
//! Each data domain keeps JSON snapshots in a string key-value store. A
//! snapshot is only served while it is younger than its domain TTL and owned
//! by the identity asking for it; anything else is evicted on read.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{PlayTogetherError, Result};
use crate::models::{Friend, Game, TableViewState};

pub const SETTINGS_KEY: &str = "steam-play-together-settings";
pub const LIBRARY_KEY_PREFIX: &str = "steam-library-cache";
pub const FRIENDS_KEY: &str = "steam-friends-cache";
pub const COMMON_GAMES_KEY: &str = "steam-common-games-cache";

const MINUTE_MS: i64 = 60 * 1000;

// ============================================================================
// Storage and time seams
// ============================================================================

/// String key-value storage (browser localStorage or an in-memory map)
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Wall clock in milliseconds since the Unix epoch
pub trait Clock {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<i64>>,
}

impl ManualClock {
    pub fn at(now_millis: i64) -> Self {
        Self {
            now: Rc::new(Cell::new(now_millis)),
        }
    }

    pub fn set(&self, now_millis: i64) {
        self.now.set(now_millis);
    }

    pub fn advance(&self, millis: i64) {
        self.now.set(self.now.get() + millis);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.get()
    }
}

// ============================================================================
// Domains and snapshots
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDomain {
    Settings,
    Library,
    Friends,
    CommonGames,
}

impl CacheDomain {
    /// `None` means entries never expire
    pub fn ttl_millis(&self) -> Option<i64> {
        match self {
            CacheDomain::Settings => None,
            CacheDomain::Library => Some(60 * MINUTE_MS),
            CacheDomain::Friends => Some(30 * MINUTE_MS),
            CacheDomain::CommonGames => Some(15 * MINUTE_MS),
        }
    }

    /// Storage key for `owner`. Only library snapshots are namespaced per identity.
    pub fn key(&self, owner: &str) -> String {
        match self {
            CacheDomain::Settings => SETTINGS_KEY.to_string(),
            CacheDomain::Library => format!("{}-{}", LIBRARY_KEY_PREFIX, owner),
            CacheDomain::Friends => FRIENDS_KEY.to_string(),
            CacheDomain::CommonGames => COMMON_GAMES_KEY.to_string(),
        }
    }
}

/// A cached value that knows whose it is and when it was fetched
pub trait Snapshot: Serialize + DeserializeOwned {
    fn owner(&self) -> &str;
    fn timestamp(&self) -> i64;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibrarySnapshot {
    pub steam_id: String,
    pub user_name: String,
    pub games: Vec<Game>,
    pub game_count: u32,
    pub timestamp: i64,
    #[serde(default)]
    pub table_view_state: TableViewState,
}

impl Snapshot for LibrarySnapshot {
    fn owner(&self) -> &str {
        &self.steam_id
    }

    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendsSnapshot {
    pub steam_id: String,
    pub friends: Vec<Friend>,
    pub timestamp: i64,
}

impl Snapshot for FriendsSnapshot {
    fn owner(&self) -> &str {
        &self.steam_id
    }

    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonGamesSnapshot {
    pub steam_id: String,
    pub common_games: Vec<Game>,
    /// Friend ids of the query that produced `common_games`
    pub friend_ids: Vec<String>,
    #[serde(default)]
    pub public_friends: Vec<String>,
    #[serde(default)]
    pub private_friends: Vec<String>,
    pub timestamp: i64,
}

impl Snapshot for CommonGamesSnapshot {
    fn owner(&self) -> &str {
        &self.steam_id
    }

    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

// ============================================================================
// Snapshot cache
// ============================================================================

/// Typed view of one cache domain over a shared store and clock
pub struct SnapshotCache<T, S, C> {
    domain: CacheDomain,
    store: S,
    clock: C,
    _snapshot: PhantomData<T>,
}

impl<T, S, C> SnapshotCache<T, S, C>
where
    T: Snapshot,
    S: KeyValueStore,
    C: Clock,
{
    pub fn new(domain: CacheDomain, store: S, clock: C) -> Self {
        Self {
            domain,
            store,
            clock,
            _snapshot: PhantomData,
        }
    }

    pub fn domain(&self) -> CacheDomain {
        self.domain
    }

    pub fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    fn load(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to read cache entry");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding unreadable cache entry");
                self.evict(key);
                None
            }
        }
    }

    fn evict(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            tracing::warn!(key = %key, error = %e, "Failed to remove cache entry");
        }
    }

    /// Fresh snapshot for `owner`. Expired, foreign or unreadable entries are removed.
    pub fn read(&self, owner: &str) -> Option<T> {
        let key = self.domain.key(owner);
        let snapshot = self.load(&key)?;

        if snapshot.owner() != owner {
            tracing::debug!(key = %key, "Cache entry belongs to another identity");
            self.evict(&key);
            return None;
        }

        if let Some(ttl) = self.domain.ttl_millis() {
            if self.now() - snapshot.timestamp() >= ttl {
                tracing::debug!(key = %key, "Cache entry expired");
                self.evict(&key);
                return None;
            }
        }

        Some(snapshot)
    }

    /// Snapshot for `owner` up to `max_age_millis` old, left in place either way
    pub fn read_stale(&self, owner: &str, max_age_millis: i64) -> Option<T> {
        let key = self.domain.key(owner);
        let snapshot = self.load(&key)?;
        let age = self.now() - snapshot.timestamp();
        (snapshot.owner() == owner && age < max_age_millis).then_some(snapshot)
    }

    /// Replace the entry. Failures are logged, never returned.
    pub fn write(&self, owner: &str, snapshot: &T) {
        let key = self.domain.key(owner);
        let result = serde_json::to_string(snapshot)
            .map_err(PlayTogetherError::from)
            .and_then(|json| self.store.set(&key, &json));
        if let Err(e) = result {
            tracing::warn!(key = %key, error = %e, "Failed to write cache entry");
        }
    }

    pub fn invalidate(&self, owner: &str) {
        self.evict(&self.domain.key(owner));
    }
}

// ============================================================================
// Visibility partitions
// ============================================================================

/// Public and private friend ids, disjoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityPartitions {
    pub public: Vec<String>,
    pub private: Vec<String>,
}

/// Ids in `queried` take their value from `latest`; every other id keeps its previous value.
pub fn merge_visibility(
    previous: &VisibilityPartitions,
    queried: &[String],
    latest: &VisibilityPartitions,
) -> VisibilityPartitions {
    let queried: HashSet<&str> = queried.iter().map(String::as_str).collect();
    let keep = |ids: &[String], fresh: &[String]| -> Vec<String> {
        ids.iter()
            .filter(|id| !queried.contains(id.as_str()))
            .chain(fresh.iter())
            .cloned()
            .collect()
    };

    VisibilityPartitions {
        public: keep(&previous.public, &latest.public),
        private: keep(&previous.private, &latest.private),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;
    const HOUR: i64 = 60 * MINUTE_MS;

    fn library(owner: &str, timestamp: i64) -> LibrarySnapshot {
        LibrarySnapshot {
            steam_id: owner.to_string(),
            user_name: format!("User {}", owner),
            games: vec![Game::new(1, "Alpha")],
            game_count: 1,
            timestamp,
            table_view_state: TableViewState::default(),
        }
    }

    fn library_cache(store: &MemoryStore, clock: &ManualClock) -> SnapshotCache<LibrarySnapshot, MemoryStore, ManualClock> {
        SnapshotCache::new(CacheDomain::Library, store.clone(), clock.clone())
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ttl_boundary() {
        let store = MemoryStore::new();
        let clock = ManualClock::at(T0);
        let cache = library_cache(&store, &clock);
        cache.write("A", &library("A", T0));

        clock.set(T0 + HOUR - 1);
        assert_eq!(cache.read("A"), Some(library("A", T0)));

        clock.set(T0 + HOUR + 1);
        assert_eq!(cache.read("A"), None);
        assert!(!store.contains("steam-library-cache-A"));
    }

    #[test]
    fn exactly_ttl_old_is_expired() {
        let store = MemoryStore::new();
        let clock = ManualClock::at(T0);
        let cache = library_cache(&store, &clock);
        cache.write("A", &library("A", T0));

        clock.set(T0 + HOUR);
        assert_eq!(cache.read("A"), None);
    }

    #[test]
    fn library_snapshots_are_isolated_per_identity() {
        let store = MemoryStore::new();
        let clock = ManualClock::at(T0);
        let cache = library_cache(&store, &clock);

        let mut b = library("B", T0);
        b.games = vec![Game::new(2, "Beta")];
        cache.write("A", &library("A", T0));
        cache.write("B", &b);

        assert_eq!(cache.read("A").unwrap().games, vec![Game::new(1, "Alpha")]);
        assert_eq!(cache.read("B").unwrap().games, vec![Game::new(2, "Beta")]);

        cache.invalidate("B");
        assert!(cache.read("B").is_none());
        assert!(cache.read("A").is_some());
    }

    #[test]
    fn single_key_domain_evicts_foreign_owner() {
        let store = MemoryStore::new();
        let clock = ManualClock::at(T0);
        let cache: SnapshotCache<FriendsSnapshot, _, _> =
            SnapshotCache::new(CacheDomain::Friends, store.clone(), clock.clone());
        cache.write(
            "A",
            &FriendsSnapshot {
                steam_id: "A".to_string(),
                friends: Vec::new(),
                timestamp: T0,
            },
        );

        assert!(cache.read("B").is_none());
        assert!(!store.contains(FRIENDS_KEY));
        assert!(cache.read("A").is_none());
    }

    #[test]
    fn unreadable_entry_is_removed() {
        let store = MemoryStore::new();
        store.set("steam-library-cache-A", "{not json").unwrap();
        let cache = library_cache(&store, &ManualClock::at(T0));

        assert!(cache.read("A").is_none());
        assert!(!store.contains("steam-library-cache-A"));
    }

    #[test]
    fn read_stale_serves_within_max_age_without_evicting() {
        let store = MemoryStore::new();
        let clock = ManualClock::at(T0);
        let cache = library_cache(&store, &clock);
        cache.write("A", &library("A", T0));

        clock.set(T0 + HOUR + 5 * MINUTE_MS);
        assert!(cache.read_stale("A", 2 * HOUR).is_some());
        assert!(store.contains("steam-library-cache-A"));

        clock.set(T0 + 2 * HOUR);
        assert!(cache.read_stale("A", 2 * HOUR).is_none());
        assert!(store.contains("steam-library-cache-A"));
    }

    #[test]
    fn table_view_state_defaults_when_missing() {
        let store = MemoryStore::new();
        store
            .set(
                "steam-library-cache-A",
                &format!(
                    r#"{{"steamId":"A","userName":"A","games":[],"gameCount":0,"timestamp":{}}}"#,
                    T0
                ),
            )
            .unwrap();
        let cache = library_cache(&store, &ManualClock::at(T0));
        assert_eq!(cache.read("A").unwrap().table_view_state, TableViewState::default());
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(PlayTogetherError::Storage("quota exceeded".to_string()))
        }

        fn remove(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_is_swallowed() {
        let cache: SnapshotCache<LibrarySnapshot, _, _> =
            SnapshotCache::new(CacheDomain::Library, FailingStore, ManualClock::at(T0));
        cache.write("A", &library("A", T0));
        assert!(cache.read("A").is_none());
    }

    #[test]
    fn settings_never_expire() {
        assert_eq!(CacheDomain::Settings.ttl_millis(), None);
        assert_eq!(CacheDomain::Settings.key("anyone"), SETTINGS_KEY);
        assert_eq!(CacheDomain::CommonGames.ttl_millis(), Some(15 * MINUTE_MS));
    }

    #[test]
    fn merge_keeps_history_outside_the_query() {
        let previous = VisibilityPartitions {
            public: ids(&["a", "b"]),
            private: ids(&["c", "d"]),
        };
        let latest = VisibilityPartitions {
            public: ids(&["c"]),
            private: ids(&["b"]),
        };

        let merged = merge_visibility(&previous, &ids(&["b", "c"]), &latest);
        assert_eq!(merged.public, ids(&["a", "c"]));
        assert_eq!(merged.private, ids(&["d", "b"]));
    }
}
