// src/config/oracle.rs
use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_timeout_ms() -> u64 {
    15_000
}
fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// "gemini" | "openai" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// "ENV" means: read from GEMINI_API_KEY / OPENAI_API_KEY (by provider)
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            provider: default_provider(),
            model: None,
            api_key: default_api_key(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl OracleConfig {
    /// Normalize provider, resolve an "ENV" key, and sanitize the timeout.
    /// A missing key is not an error: the oracle then runs unconfigured.
    pub fn normalize(&mut self) {
        self.provider = self.provider.trim().to_lowercase();

        if self.api_key.trim().eq_ignore_ascii_case("env") {
            let var = match self.provider.as_str() {
                "openai" => "OPENAI_API_KEY",
                _ => "GEMINI_API_KEY",
            };
            self.api_key = env::var(var).unwrap_or_else(|_| {
                warn!(var, "oracle api key env var missing");
                String::new()
            });
        }

        if self.timeout_ms == 0 {
            self.timeout_ms = default_timeout_ms();
        }
    }
}
