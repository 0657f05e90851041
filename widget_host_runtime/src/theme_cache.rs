//! Persisted choice of the active theme, with an in-memory fallback when the
//! preference storage is unusable.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const CACHED_THEME_BASE_KEY: &str = "stActiveTheme";
pub const CACHED_THEME_VERSION: u32 = 2;

const PROBE_KEY: &str = "testData";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("preference storage unavailable: {0}")]
    Unavailable(String),

    #[error("preference storage quota exceeded")]
    QuotaExceeded,
}

/// Key/value preference storage (the browser's local storage, or a stand-in).
pub trait PreferenceStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError>;

    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    items: BTreeMap<String, String>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStorage for InMemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        self.items.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.items.keys().cloned().collect())
    }
}

/// What gets cached: the theme name, plus its input when it is not a preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedTheme {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_input: Option<Value>,
}

#[derive(Debug)]
pub struct ThemeCache<S: PreferenceStorage> {
    storage: S,
    key: String,
    fallback: Option<CachedTheme>,
}

impl<S: PreferenceStorage> ThemeCache<S> {
    /// `app_path` scopes the cache to one app when several share an origin.
    pub fn new(storage: S, app_path: &str) -> Self {
        Self {
            storage,
            key: theme_key(app_path),
            fallback: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn get(&self) -> Option<CachedTheme> {
        if !self.storage_available_readonly() {
            return self.fallback.clone();
        }

        let raw = match self.storage.get_item(&self.key) {
            Ok(raw) => raw?,
            Err(err) => {
                log::warn!("reading cached theme failed: {err}");
                return self.fallback.clone();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(theme) => Some(theme),
            Err(err) => {
                log::warn!("ignoring unreadable cached theme: {err}");
                None
            }
        }
    }

    /// Caches `theme`, deleting entries written by older cache versions.
    pub fn set(&mut self, theme: CachedTheme) {
        if !self.probe() {
            log::warn!("preference storage unavailable; keeping theme in memory");
            self.fallback = Some(theme);
            return;
        }

        self.remove_stale_keys();

        let stored = serde_json::to_string(&theme)
            .map_err(|err| StorageError::Unavailable(err.to_string()))
            .and_then(|raw| self.storage.set_item(&self.key, &raw));
        if let Err(err) = stored {
            log::warn!("caching theme failed, keeping it in memory: {err}");
            self.fallback = Some(theme);
        }
    }

    pub fn remove(&mut self) {
        self.fallback = None;
        if !self.probe() {
            return;
        }
        if let Err(err) = self.storage.remove_item(&self.key) {
            log::warn!("removing cached theme failed: {err}");
        }
    }

    /// Storage counts as usable if a throwaway write succeeds.
    fn probe(&mut self) -> bool {
        match self
            .storage
            .set_item(PROBE_KEY, PROBE_KEY)
            .and_then(|()| self.storage.remove_item(PROBE_KEY))
        {
            Ok(()) => true,
            Err(err) => {
                log::debug!("preference storage probe failed: {err}");
                false
            }
        }
    }

    fn storage_available_readonly(&self) -> bool {
        self.storage.keys().is_ok()
    }

    fn remove_stale_keys(&mut self) {
        let keys = match self.storage.keys() {
            Ok(keys) => keys,
            Err(err) => {
                log::warn!("listing preference keys failed: {err}");
                return;
            }
        };

        for key in keys
            .into_iter()
            .filter(|key| key.starts_with(CACHED_THEME_BASE_KEY) && *key != self.key)
            .filter(|key| !key.ends_with(&format!("-v{CACHED_THEME_VERSION}")))
        {
            if let Err(err) = self.storage.remove_item(&key) {
                log::warn!("removing stale theme key {key} failed: {err}");
            }
        }
    }
}

fn theme_key(app_path: &str) -> String {
    format!("{CACHED_THEME_BASE_KEY}-{app_path}-v{CACHED_THEME_VERSION}")
}
