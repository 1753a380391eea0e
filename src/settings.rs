//! Locally persisted settings with environment fallbacks.
//!
//! The reference deployment keeps these in browser local storage; here they
//! are a plain value type the host can fill from whatever key-value storage
//! it has, with environment variables as the fallback layer and hardcoded
//! defaults underneath.

use crate::session::SessionConfig;

/// Endpoint used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://test-chat.atomic-dns.com:3001";

pub const ENV_API_URL: &str = "PERSONACHAT_API_URL";
pub const ENV_API_KEY: &str = "PERSONACHAT_API_KEY";
pub const ENV_SYSTEM_PROMPT: &str = "PERSONACHAT_SYSTEM_PROMPT";

/// Optional overrides for a session config. Unset values fall through to the
/// base config they are applied to.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    /// Overrides the active persona's system prompt when set.
    pub system_prompt: Option<String>,
}

impl Settings {
    /// Read settings from the process environment. Empty values count as
    /// unset.
    pub fn from_env() -> Self {
        Self {
            api_url: env_non_empty(ENV_API_URL),
            api_key: env_non_empty(ENV_API_KEY),
            system_prompt: env_non_empty(ENV_SYSTEM_PROMPT),
        }
    }

    /// Overlay these settings on a base config.
    pub fn apply_to(&self, mut config: SessionConfig) -> SessionConfig {
        if let Some(url) = &self.api_url {
            config.base_url = url.clone();
        }
        if let Some(key) = &self.api_key {
            config.api_key = Some(key.clone());
        }
        if let Some(prompt) = &self.system_prompt {
            config.system_prompt = prompt.clone();
        }
        config
    }

    /// Session config built from these settings over the defaults.
    pub fn session_config(&self) -> SessionConfig {
        self.apply_to(SessionConfig::new(DEFAULT_API_URL, ""))
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
