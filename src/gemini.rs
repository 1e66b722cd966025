//! Minimal Gemini REST client
//!
//! Covers the single `generateContent` call the gateway needs. Response
//! types accept both the camelCase field names the REST API emits and the
//! snake_case names older SDK payloads used, so a version drift on the
//! provider side does not break deserialization. Usage metadata is kept as
//! raw JSON; its field names have varied the most and are resolved with
//! alias lookup in the normalization layer.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Generation parameters forwarded to the provider.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

/// One segment of a candidate's content. Only text parts carry an answer;
/// parts of other modalities deserialize with `text: None`.
#[derive(Debug, Clone, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One generated response alternative.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    /// Opaque provider code for why generation stopped (string or number).
    #[serde(default, alias = "finish_reason")]
    pub finish_reason: Option<serde_json::Value>,
    /// Flattened text shortcut some SDK versions expose on the candidate.
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Raw usage block; counter names are resolved with alias lookup.
    #[serde(default, alias = "usage_metadata", alias = "usage")]
    pub usage_metadata: Option<serde_json::Value>,
}

/// Handle to one configured Gemini model.
#[derive(Debug)]
pub struct GenerativeModel {
    http: Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl GenerativeModel {
    pub fn new(
        api_key: String,
        model: String,
        api_base: String,
        timeout_secs: u64,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            api_key,
            model,
            api_base,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Single best-effort `generateContent` call. No retry, no backoff.
    pub async fn generate_content(
        &self,
        prompt: &str,
        config: GenerationConfig,
    ) -> Result<GenerateContentResponse> {
        let url = format!(
            "{}/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        );

        debug!(model = %self.model, "sending generateContent request");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&GenerateContentRequest {
                contents: vec![RequestContent {
                    parts: vec![RequestPart {
                        text: prompt.to_string(),
                    }],
                }],
                generation_config: config,
            })
            .send()
            .await
            .context("Gemini request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini returned error {}: {}", status, body);
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .context("invalid Gemini response body")
    }
}
