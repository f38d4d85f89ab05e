//! Asks an OpenAI-compatible chat model to pick the best product from a ranked
//! shortlist. Every failure degrades to [`Advice::Unavailable`]; callers never see
//! an error from this crate once an [`Advisor`] exists.

use anyhow::{Context, Result};
use reqwest::{header, Client};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use shopsearch_core::ProductMeta;
use std::time::Duration;

pub mod config;
pub mod shortlist;

pub use config::AdvisorConfig;

/// Exact reply the model is told to give when nothing fits.
pub const NO_MATCH: &str = "There are no good products that fit the request based on the retrieved results.";
/// Shown instead of advice when the model could not be reached or answered garbage.
pub const UNAVAILABLE: &str = "RAG is not available. Check your credentials (.env file) or account limits.";

#[derive(Debug, Clone, PartialEq)]
pub enum Advice {
    Recommendation(String),
    NoMatch,
    Unavailable,
}

impl Advice {
    pub fn text(&self) -> &str {
        match self {
            Advice::Recommendation(text) => text,
            Advice::NoMatch => NO_MATCH,
            Advice::Unavailable => UNAVAILABLE,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Advice::Recommendation(_) => "recommendation",
            Advice::NoMatch => "no_match",
            Advice::Unavailable => "unavailable",
        }
    }

    /// Classify a raw model reply. Quotes and whitespace around the sentinel are tolerated.
    pub fn from_reply(reply: &str) -> Self {
        let trimmed = reply.trim().trim_matches(|c: char| c == '"' || c == '\'').trim();
        if trimmed.is_empty() {
            Advice::Unavailable
        } else if trimmed == NO_MATCH || (trimmed.len() < NO_MATCH.len() + 16 && trimmed.contains(NO_MATCH)) {
            Advice::NoMatch
        } else {
            Advice::Recommendation(trimmed.to_string())
        }
    }
}

/// Serializes as `{"kind": "...", "text": "..."}` so consumers can tell the
/// no-match sentinel and the fallback apart without comparing strings.
impl Serialize for Advice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Advice", 2)?;
        s.serialize_field("kind", self.kind())?;
        s.serialize_field("text", self.text())?;
        s.end()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct Advisor {
    client: Client,
    config: AdvisorConfig,
}

impl Advisor {
    pub fn new(config: AdvisorConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs.clamp(1, 60)))
            .build()
            .context("building advisor HTTP client")?;
        Ok(Self { client, config })
    }

    /// Recommend one product from `ranked` (best first) for `query`.
    pub async fn recommend(&self, query: &str, ranked: &[ProductMeta]) -> Advice {
        if ranked.is_empty() {
            return Advice::NoMatch;
        }
        let Some(api_key) = self.config.api_key.as_deref() else {
            tracing::debug!("no API key configured, skipping advisor");
            return Advice::Unavailable;
        };

        let picked = shortlist::prefilter(query, ranked, self.config.top_n);
        let prompt = shortlist::build_prompt(&shortlist::format_shortlist(&picked), query);
        tracing::debug!(shortlist = picked.len(), model = %self.config.model, "asking advisor");

        match self.complete(api_key, &prompt).await {
            Ok(reply) => Advice::from_reply(&reply),
            Err(e) => {
                tracing::warn!(error = %e, "advisor call failed");
                Advice::Unavailable
            }
        }
    }

    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);
        let req = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: 0.0,
        };

        let resp = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, format!("Bearer {api_key}"))
            .json(&req)
            .send()
            .await
            .context("sending chat completion request")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("chat completion returned {status}: {body}");
        }

        let body: ChatResponse = resp.json().await.context("decoding chat completion")?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .context("chat completion had no content")
    }
}
