use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::agent::ai_model::{DEFAULT_BASE_URL, DEFAULT_MODEL};

pub const DEFAULT_CONFIG_FILE: &str = "autofill.yaml";
pub const API_KEY_ENV: &str = "MISTRAL_API_KEY";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "form-autofill",
    version,
    about = "Scan job application forms and fill them from a saved profile"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: autofill.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Mistral API key (overrides config file and MISTRAL_API_KEY)
    #[arg(long, global = true)]
    pub api_key: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the fields detected in a page snapshot
    Scan {
        /// Page snapshot JSON
        #[arg(long)]
        page: String,

        /// Output format: table or json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Fill a page snapshot from a profile
    Fill {
        /// Page snapshot JSON
        #[arg(long)]
        page: String,

        /// Profile JSON
        #[arg(long)]
        profile: String,

        /// Field analyzer: local or ai (default: ai when enabled in config)
        #[arg(long)]
        analyzer: Option<String>,

        /// Write the filled page snapshot here
        #[arg(short, long)]
        output: Option<String>,

        /// Type without per-keystroke pauses
        #[arg(long)]
        no_delay: bool,

        /// Saved-answer store consulted for unmatched questions
        #[arg(long)]
        store: Option<String>,
    },

    /// Check a profile for missing or malformed entries
    Validate {
        /// Profile JSON
        #[arg(long)]
        profile: String,
    },

    /// Save an answer to a free-text question
    Remember {
        #[arg(long)]
        store: String,

        #[arg(long)]
        question: String,

        #[arg(long)]
        answer: String,
    },

    /// Look up the saved answer closest to a question
    Recall {
        #[arg(long)]
        store: String,

        #[arg(long)]
        question: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `autofill.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub typing: TypingConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub trace_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    #[serde(default)]
    pub debug_mode: bool,

    #[serde(default = "default_true")]
    pub auto_fill: bool,

    #[serde(default = "default_delay")]
    pub delay_ms: u64,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            debug_mode: false,
            auto_fill: true,
            delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingConfig {
    #[serde(default = "default_min_delay")]
    pub min_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 30,
            max_delay_ms: 80,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    pub api_key: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

// Serde default helpers
fn default_true() -> bool { true }
fn default_delay() -> u64 { 500 }
fn default_min_delay() -> u64 { 30 }
fn default_max_delay() -> u64 { 80 }
fn default_base_url() -> String { DEFAULT_BASE_URL.to_string() }
fn default_model() -> String { DEFAULT_MODEL.to_string() }
fn default_timeout() -> u64 { 30 }
fn default_retries() -> u32 { 3 }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_FILE);
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = config_path, error = %e, "malformed config, using defaults");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

/// API key: CLI flag > config file > environment. Blank values are skipped.
pub fn resolve_api_key(cli_key: Option<&str>, config: &AppConfig) -> Option<String> {
    let present = |k: &String| !k.trim().is_empty();
    cli_key
        .map(str::to_string)
        .filter(present)
        .or_else(|| config.ai.api_key.clone().filter(present))
        .or_else(|| std::env::var(API_KEY_ENV).ok().filter(present))
}
