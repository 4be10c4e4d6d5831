use serde::{Deserialize, Serialize};

use crate::{
    agent::error::AutofillError,
    storage::store::{KeyValueStore, get_typed, set_typed},
};

pub const SETTINGS_KEY: &str = "settings";
pub const PROFILE_KEY: &str = "profile";
pub const API_KEY_KEY: &str = "apiKey";

/// User-facing toggles persisted next to the profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub debug_mode: bool,
    #[serde(default = "default_true")]
    pub auto_fill: bool,
    /// Settle time before a run starts, in milliseconds
    #[serde(default = "default_delay", rename = "delay")]
    pub delay_ms: u64,
}

fn default_true() -> bool { true }
fn default_delay() -> u64 { 500 }

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug_mode: false,
            auto_fill: true,
            delay_ms: 500,
        }
    }
}

/// Stored settings, or defaults when none have been saved.
pub fn load_settings(store: &dyn KeyValueStore) -> Result<Settings, AutofillError> {
    Ok(get_typed(store, SETTINGS_KEY)?.unwrap_or_default())
}

pub fn save_settings(store: &dyn KeyValueStore, settings: &Settings) -> Result<(), AutofillError> {
    set_typed(store, SETTINGS_KEY, settings)
}

/// Write default settings unless some are already stored. Returns whether
/// anything was written.
pub fn ensure_default_settings(store: &dyn KeyValueStore) -> Result<bool, AutofillError> {
    if get_typed::<Settings, _>(store, SETTINGS_KEY)?.is_some() {
        return Ok(false);
    }
    save_settings(store, &Settings::default())?;
    Ok(true)
}
