use serde::{Deserialize, Serialize};

/// Connection settings for an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Without a key the advisor answers `Advice::Unavailable` without calling out.
    pub api_key: Option<String>,
    /// Base URL; `/v1/chat/completions` is appended.
    pub base_url: String,
    pub model: String,
    /// Whole-request timeout, capped at 60.
    pub timeout_secs: u64,
    /// Maximum number of products rendered into the prompt.
    pub top_n: usize,
    pub user_agent: String,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.groq.com/openai".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            timeout_secs: 15,
            top_n: 20,
            user_agent: concat!("shopsearch-advisor/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl AdvisorConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(key) = env_any(&["LLM_API_KEY", "GROQ_API_KEY"]) {
            config.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = env_any(&["LLM_MODEL", "GROQ_MODEL"]) {
            config.model = model;
        }
        if let Ok(val) = std::env::var("LLM_TIMEOUT_SECS") {
            if let Ok(v) = val.parse::<u64>() {
                config.timeout_secs = v.min(60);
            }
        }
        if let Ok(val) = std::env::var("LLM_TOP_N") {
            if let Ok(v) = val.parse() {
                config.top_n = v;
            }
        }
        config
    }
}

fn env_any(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|v| !v.trim().is_empty())
}
