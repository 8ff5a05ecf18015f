use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Aggregator queried when none is configured.
pub const DEFAULT_AGGREGATOR: &str = "aws-controltower-GuardrailsComplianceAggregator";

/// CSV file written when no output path is configured.
pub const DEFAULT_OUTPUT: &str = "results.csv";

/// Attempts made by the SDK's standard retry mode per request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

// ── Env helpers ──────────────────────────────────────────────────

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries `{PROFILE}_{KEY}` first, falls back to `{KEY}`.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── ExportConfig ─────────────────────────────────────────────────

/// Settings for one export run.
///
/// Reads from environment variables with optional profile prefix.
/// When `CONFIG_EXPORT_PROFILE=PROD`, checks `PROD_CONFIG_EXPORT_OUTPUT`
/// before `CONFIG_EXPORT_OUTPUT`. Command-line flags are layered on top
/// by the binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Name of the configuration aggregator to query.
    pub aggregator: String,
    /// Destination CSV path.
    pub output: PathBuf,
    /// AWS region; `None` defers to the SDK's default provider chain.
    pub region: Option<String>,
    /// Max attempts for the SDK's standard retry mode (at least 1).
    pub max_attempts: u32,
    /// Per-page result limit sent to the service (`None` = service default).
    pub page_limit: Option<i32>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            aggregator: DEFAULT_AGGREGATOR.to_string(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            region: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            page_limit: None,
        }
    }
}

impl ExportConfig {
    /// Build config from environment variables (call [`load_dotenv`] first).
    ///
    /// Reads `CONFIG_EXPORT_PROFILE` to determine the profile prefix.
    pub fn from_env() -> Self {
        let profile = env_opt("CONFIG_EXPORT_PROFILE")
            .map(|s| s.to_uppercase())
            .unwrap_or_default();
        Self::from_env_profiled(&profile)
    }

    /// Build config for a specific named profile.
    ///
    /// `CONFIG_EXPORT_REGION` falls back to `AWS_REGION`.
    pub fn from_env_profiled(profile: &str) -> Self {
        let region = profiled_env_opt(profile, "CONFIG_EXPORT_REGION")
            .or_else(|| profiled_env_opt(profile, "AWS_REGION"));

        let page_limit = match profiled_env_u32(profile, "CONFIG_EXPORT_PAGE_LIMIT", 0) {
            0 => None,
            n => i32::try_from(n).ok(),
        };

        Self {
            aggregator: profiled_env_or(profile, "CONFIG_EXPORT_AGGREGATOR", DEFAULT_AGGREGATOR),
            output: PathBuf::from(profiled_env_or(profile, "CONFIG_EXPORT_OUTPUT", DEFAULT_OUTPUT)),
            region,
            max_attempts: profiled_env_u32(
                profile,
                "CONFIG_EXPORT_MAX_ATTEMPTS",
                DEFAULT_MAX_ATTEMPTS,
            )
            .max(1),
            page_limit,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
