//! Request validation and response normalization around the Gemini client.
//!
//! This is the layer between the raw provider response and the HTTP
//! contract. It clamps the caller-supplied token limit before the network
//! call, walks the candidate/part structure defensively to extract text,
//! reads usage counters with tolerant field lookup, and classifies every
//! failure mode into a [`ServiceError`].

use serde_json::Value;
use tracing::debug;

use crate::config::Settings;
use crate::error::ServiceError;
use crate::gemini::{Candidate, GenerateContentResponse, GenerationConfig, GenerativeModel};

/// Default when the caller omits `max_tokens` or sends a non-integer.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
/// Lower clamp bound.
pub const MIN_ALLOWED_TOKENS: u32 = 1;
/// Upper clamp bound. Kept conservative; models have internal limits too.
pub const MAX_ALLOWED_TOKENS: u32 = 100_000;

/// Resolve a raw `max_tokens` value of unknown type into a valid limit.
///
/// Never fails: a missing or malformed parameter falls back to the default,
/// and out-of-range integers are clamped, so a bad parameter alone never
/// blocks a request.
pub fn resolve_max_tokens(raw: Option<&Value>) -> u32 {
    let Some(n) = raw.and_then(Value::as_i64) else {
        return DEFAULT_MAX_TOKENS;
    };
    if n < MIN_ALLOWED_TOKENS as i64 {
        MIN_ALLOWED_TOKENS
    } else if n > MAX_ALLOWED_TOKENS as i64 {
        MAX_ALLOWED_TOKENS
    } else {
        n as u32
    }
}

/// Provider-reported token counts.
///
/// `None` means "not reported", which is distinct from a reported zero and
/// must stay distinct.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageCounters {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

impl UsageCounters {
    /// The reported total, or the sum of both per-direction counters when
    /// the total is missing. `None` when the provider reported nothing
    /// usable.
    pub fn derived_total(&self) -> Option<u64> {
        self.total_tokens
            .or(match (self.prompt_tokens, self.completion_tokens) {
                (Some(prompt), Some(completion)) => Some(prompt + completion),
                _ => None,
            })
    }
}

// Field-name aliases per counter, in preference order. The Gemini SDK has
// used several names for these across versions.
const PROMPT_TOKEN_ALIASES: &[&str] =
    &["prompt_token_count", "promptTokenCount", "prompt_tokens"];
const COMPLETION_TOKEN_ALIASES: &[&str] = &[
    "candidates_token_count",
    "candidatesTokenCount",
    "completion_tokens",
    "candidate_tokens",
];
const TOTAL_TOKEN_ALIASES: &[&str] =
    &["total_token_count", "totalTokenCount", "total_tokens"];

fn lookup_counter(meta: &Value, aliases: &[&str]) -> Option<u64> {
    aliases
        .iter()
        .find_map(|key| meta.get(key).and_then(Value::as_u64))
}

/// Best-effort usage extraction; absent metadata yields all-`None`.
pub fn extract_usage(usage_metadata: Option<&Value>) -> UsageCounters {
    let Some(meta) = usage_metadata else {
        return UsageCounters::default();
    };
    UsageCounters {
        prompt_tokens: lookup_counter(meta, PROMPT_TOKEN_ALIASES),
        completion_tokens: lookup_counter(meta, COMPLETION_TOKEN_ALIASES),
        total_tokens: lookup_counter(meta, TOTAL_TOKEN_ALIASES),
    }
}

/// Normalized result of one successful provider call.
#[derive(Debug, Clone)]
pub struct NormalizedAnswer {
    pub answer: String,
    pub model: String,
    pub usage: UsageCounters,
}

/// Text of a candidate: every non-empty text part in original order,
/// concatenated with no separator. Parts without text (images etc.) are
/// skipped. Falls back to the candidate's flattened `text` shortcut when no
/// part contributed anything.
fn candidate_text(candidate: &Candidate) -> Option<String> {
    let mut pieces: Vec<&str> = Vec::new();
    if let Some(content) = &candidate.content {
        for part in &content.parts {
            if let Some(text) = part.text.as_deref() {
                if !text.is_empty() {
                    pieces.push(text);
                }
            }
        }
    }

    if pieces.is_empty() {
        return candidate.text.clone().filter(|t| !t.is_empty());
    }
    Some(pieces.concat())
}

fn render_finish_reason(reason: Option<&Value>) -> String {
    match reason {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "unknown".to_string(),
    }
}

/// Classify a raw provider response into a normalized answer or an error.
///
/// Checks run in order; each is a termination point. Errors raised here are
/// final and must not be re-wrapped by callers.
pub fn normalize_response(
    response: &GenerateContentResponse,
    model: &str,
) -> Result<NormalizedAnswer, ServiceError> {
    if response.candidates.is_empty() {
        return Err(ServiceError::NoCandidates);
    }

    let candidate = &response.candidates[0];
    let Some(answer) = candidate_text(candidate) else {
        let finish_reason = render_finish_reason(candidate.finish_reason.as_ref());
        debug!(%finish_reason, "no text parts found in Gemini candidate");
        return Err(ServiceError::EmptyResponse { finish_reason });
    };

    let usage = extract_usage(response.usage_metadata.as_ref());
    debug!(?usage, "Gemini response received");

    Ok(NormalizedAnswer {
        answer,
        model: model.to_string(),
        usage,
    })
}

/// Gemini-backed LLM client.
///
/// Owns the configured model handle and applies validation before the call
/// and normalization/classification after it.
#[derive(Debug)]
pub struct LlmClient {
    model: GenerativeModel,
}

impl LlmClient {
    /// Build a client from settings.
    ///
    /// Fails at construction time when the credential is missing or the
    /// HTTP client cannot be built, so a broken configuration surfaces
    /// before any provider call is attempted.
    pub fn new(settings: &Settings) -> Result<Self, ServiceError> {
        let api_key = settings.gemini_api_key.clone().ok_or_else(|| {
            ServiceError::Configuration(
                "Gemini API key missing in environment variables.".to_string(),
            )
        })?;

        let model = GenerativeModel::new(
            api_key,
            settings.model.clone(),
            settings.api_base.clone(),
            settings.timeout_secs,
        )
        .map_err(|e| {
            ServiceError::Configuration(format!("Failed to initialize Gemini client: {e}"))
        })?;

        Ok(Self { model })
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Send one prompt and return the normalized answer.
    ///
    /// Failures from the provider call itself are classified as
    /// [`ServiceError::Provider`]; errors already classified by
    /// [`normalize_response`] pass through unchanged.
    pub async fn ask(
        &self,
        prompt: &str,
        max_tokens: Option<&Value>,
    ) -> Result<NormalizedAnswer, ServiceError> {
        let max_output_tokens = resolve_max_tokens(max_tokens);

        debug!(max_output_tokens, prompt_len = prompt.len(), "sending prompt to Gemini");

        let response = self
            .model
            .generate_content(prompt, GenerationConfig { max_output_tokens })
            .await
            .map_err(|e| ServiceError::Provider(format!("{e:#}")))?;

        normalize_response(&response, self.model.model_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response_from(value: Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_resolve_max_tokens_missing() {
        assert_eq!(resolve_max_tokens(None), DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_resolve_max_tokens_non_integer() {
        assert_eq!(resolve_max_tokens(Some(&json!("lots"))), DEFAULT_MAX_TOKENS);
        assert_eq!(resolve_max_tokens(Some(&json!(5.5))), DEFAULT_MAX_TOKENS);
        assert_eq!(resolve_max_tokens(Some(&json!(null))), DEFAULT_MAX_TOKENS);
        assert_eq!(resolve_max_tokens(Some(&json!({}))), DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_resolve_max_tokens_clamps() {
        assert_eq!(resolve_max_tokens(Some(&json!(0))), 1);
        assert_eq!(resolve_max_tokens(Some(&json!(-50))), 1);
        assert_eq!(resolve_max_tokens(Some(&json!(200_000))), 100_000);
        assert_eq!(resolve_max_tokens(Some(&json!(5000))), 5000);
        assert_eq!(resolve_max_tokens(Some(&json!(1))), 1);
        assert_eq!(resolve_max_tokens(Some(&json!(100_000))), 100_000);
    }

    #[test]
    fn test_text_parts_concatenated_in_order() {
        let resp = response_from(json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "A"},
                    {"inlineData": {"mimeType": "image/png", "data": "…"}},
                    {"text": "B"}
                ]}
            }]
        }));

        let normalized = normalize_response(&resp, "models/gemini-test").unwrap();
        assert_eq!(normalized.answer, "AB");
        assert_eq!(normalized.model, "models/gemini-test");
    }

    #[test]
    fn test_empty_text_parts_skipped() {
        let resp = response_from(json!({
            "candidates": [{
                "content": {"parts": [{"text": ""}, {"text": "ok"}]}
            }]
        }));

        assert_eq!(normalize_response(&resp, "m").unwrap().answer, "ok");
    }

    #[test]
    fn test_fallback_candidate_text() {
        let resp = response_from(json!({
            "candidates": [{"text": "fallback answer"}]
        }));

        assert_eq!(
            normalize_response(&resp, "m").unwrap().answer,
            "fallback answer"
        );
    }

    #[test]
    fn test_no_candidates_classified() {
        for value in [json!({}), json!({"candidates": []})] {
            let resp = response_from(value);
            let err = normalize_response(&resp, "m").unwrap_err();
            assert!(matches!(err, ServiceError::NoCandidates));
            assert_eq!(err.status_code().as_u16(), 502);
        }
    }

    #[test]
    fn test_textless_candidate_carries_finish_reason() {
        let resp = response_from(json!({
            "candidates": [{
                "content": {"parts": [{"inlineData": {"mimeType": "image/png"}}]},
                "finishReason": "SAFETY"
            }]
        }));

        let err = normalize_response(&resp, "m").unwrap_err();
        assert_eq!(err.status_code().as_u16(), 502);
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_textless_candidate_without_finish_reason() {
        let resp = response_from(json!({"candidates": [{}]}));

        let err = normalize_response(&resp, "m").unwrap_err();
        assert!(err.to_string().contains("finish_reason=unknown"));
    }

    #[test]
    fn test_usage_derivation_from_parts() {
        let usage = extract_usage(Some(&json!({
            "promptTokenCount": 10,
            "candidatesTokenCount": 5
        })));
        assert_eq!(usage.prompt_tokens, Some(10));
        assert_eq!(usage.completion_tokens, Some(5));
        assert_eq!(usage.total_tokens, None);
        assert_eq!(usage.derived_total(), Some(15));
    }

    #[test]
    fn test_usage_total_only() {
        let usage = extract_usage(Some(&json!({"totalTokenCount": 20})));
        assert_eq!(usage.derived_total(), Some(20));
    }

    #[test]
    fn test_usage_all_absent_is_none_not_zero() {
        let usage = extract_usage(None);
        assert_eq!(usage, UsageCounters::default());
        assert_eq!(usage.derived_total(), None);

        let usage = extract_usage(Some(&json!({})));
        assert_eq!(usage.derived_total(), None);
    }

    #[test]
    fn test_usage_zero_stays_zero() {
        let usage = extract_usage(Some(&json!({
            "promptTokenCount": 0,
            "candidatesTokenCount": 0
        })));
        assert_eq!(usage.prompt_tokens, Some(0));
        assert_eq!(usage.derived_total(), Some(0));
    }

    #[test]
    fn test_usage_alias_preference_order() {
        // First matching alias wins when multiple spellings are present.
        let usage = extract_usage(Some(&json!({
            "prompt_token_count": 1,
            "promptTokenCount": 2
        })));
        assert_eq!(usage.prompt_tokens, Some(1));
    }

    #[test]
    fn test_usage_snake_case_names() {
        let usage = extract_usage(Some(&json!({
            "prompt_tokens": 3,
            "candidate_tokens": 4,
            "total_tokens": 7
        })));
        assert_eq!(usage.prompt_tokens, Some(3));
        assert_eq!(usage.completion_tokens, Some(4));
        assert_eq!(usage.total_tokens, Some(7));
    }

    #[test]
    fn test_client_requires_api_key() {
        let settings = Settings {
            app_name: "ask-gateway".into(),
            app_version: "0.0.0".into(),
            gemini_api_key: None,
            model: "models/gemini-test".into(),
            api_base: "http://localhost:1".into(),
            timeout_secs: 1,
        };

        let err = LlmClient::new(&settings).unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(_)));
        assert_eq!(err.status_code().as_u16(), 500);
    }
}
