//! Persisted layout of the main window
//!
//! Splitter positions, the reference panel toggle and the notification
//! duration survive reloads through a [`KeyValueStore`] handed in by the
//! embedder. Values are stored as plain strings under fixed keys.

use std::collections::HashMap;
use std::sync::Mutex;

use log::debug;
use serde::{Deserialize, Serialize};

/// Key of the reference panel splitter position
pub const REF_SPLITTER_KEY: &str = "mainapp_refsplitter_pos";
/// Key of the tools panel splitter position
pub const TOOLS_SPLITTER_KEY: &str = "mainapp_toolssplitter_pos";
/// Key of the reference panel toggle
pub const HIDE_REFERENCES_KEY: &str = "mainapp_hide_references";
/// Key of the notification duration, in seconds
pub const NOTIFIER_DURATION_KEY: &str = "notifierDuration";

/// String key-value persistence
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value
    fn set(&self, key: &str, value: &str);
}

/// Store that lives as long as the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value.to_string());
        }
    }
}

/// Layout of the main window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutState {
    /// Whether the reference panel is collapsed
    pub references_hidden: bool,

    /// Width of the reference panel, as a CSS length
    pub ref_splitter_pos: String,

    /// Height of the tools panel, as a CSS length
    pub tools_splitter_pos: String,

    /// Seconds a notification stays open, `0` to keep it until closed
    pub notifier_duration: u32,
}

impl Default for LayoutState {
    fn default() -> Self {
        LayoutState {
            references_hidden: false,
            ref_splitter_pos: "40px".to_string(),
            tools_splitter_pos: "400px".to_string(),
            notifier_duration: 3,
        }
    }
}

impl LayoutState {
    /// Read the layout from `store`, falling back to defaults per key
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let defaults = Self::default();
        LayoutState {
            references_hidden: store
                .get(HIDE_REFERENCES_KEY)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.references_hidden),
            ref_splitter_pos: store.get(REF_SPLITTER_KEY).unwrap_or(defaults.ref_splitter_pos),
            tools_splitter_pos: store.get(TOOLS_SPLITTER_KEY).unwrap_or(defaults.tools_splitter_pos),
            notifier_duration: store
                .get(NOTIFIER_DURATION_KEY)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.notifier_duration),
        }
    }

    /// Write every value to `store`
    pub fn save(&self, store: &dyn KeyValueStore) {
        debug!("saving layout {:?}", self);
        store.set(HIDE_REFERENCES_KEY, &self.references_hidden.to_string());
        store.set(REF_SPLITTER_KEY, &self.ref_splitter_pos);
        store.set(TOOLS_SPLITTER_KEY, &self.tools_splitter_pos);
        store.set(NOTIFIER_DURATION_KEY, &self.notifier_duration.to_string());
    }

    /// Flip the reference panel; returns the new hidden flag
    pub fn toggle_references(&mut self) -> bool {
        self.references_hidden = !self.references_hidden;
        self.references_hidden
    }

    /// Whether the reference splitter may be dragged
    pub fn ref_splitter_resizable(&self) -> bool {
        !self.references_hidden
    }

    /// Keep notifications open until closed, or close them after the
    /// default delay
    pub fn set_sticky_notifications(&mut self, sticky: bool) {
        self.notifier_duration = if sticky { 0 } else { Self::default().notifier_duration };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_empty_store() {
        let store = MemoryStore::new();
        assert_eq!(LayoutState::load(&store), LayoutState::default());
    }

    #[test]
    fn test_save_and_load() {
        let store = MemoryStore::new();
        let mut layout = LayoutState::default();
        assert!(layout.toggle_references());
        assert!(!layout.ref_splitter_resizable());
        layout.tools_splitter_pos = "520px".to_string();
        layout.set_sticky_notifications(true);
        layout.save(&store);

        assert_eq!(store.get(NOTIFIER_DURATION_KEY).as_deref(), Some("0"));
        assert_eq!(LayoutState::load(&store), layout);
    }

    #[test]
    fn test_garbage_values_fall_back() {
        let store = MemoryStore::new();
        store.set(HIDE_REFERENCES_KEY, "maybe");
        store.set(NOTIFIER_DURATION_KEY, "-1");
        store.set(REF_SPLITTER_KEY, "25%");

        let layout = LayoutState::load(&store);
        assert!(!layout.references_hidden);
        assert_eq!(layout.notifier_duration, 3);
        assert_eq!(layout.ref_splitter_pos, "25%");
    }
}
