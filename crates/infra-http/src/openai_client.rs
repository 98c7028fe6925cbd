//! OpenAI-compatible chat-completions translation client.
//!
//! One request per chunk, no streaming and no retries: a failed chunk fails
//! the whole run, and the caller decides what happens next.

use async_trait::async_trait;
use regex::Regex;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};
use transcache_core::port::{TranslateError, TranslationClient};

const SYSTEM_PROMPT: &str = "You are a legal HTML translator. Preserve all HTML tags strictly. \
Never wrap output in markdown code blocks or backticks. Return raw HTML only. \
Always translate the COMPLETE text without cutting off.";

/// Response token budget bounds
const MIN_MAX_TOKENS: usize = 4096;
const MAX_MAX_TOKENS: usize = 16000;

/// Language codes with a known display name
const LANGUAGE_NAMES: [(&str, &str); 8] = [
    ("uk", "Ukrainian"),
    ("de", "German"),
    ("en", "English"),
    ("fr", "French"),
    ("it", "Italian"),
    ("es", "Spanish"),
    ("pl", "Polish"),
    ("nl", "Dutch"),
];

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// e.g. `https://api.openai.com/v1`
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    pub check_timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(300),
            check_timeout: Duration::from_secs(10),
        }
    }
}

pub struct OpenAiTranslationClient {
    http: reqwest::Client,
    config: OpenAiConfig,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// English name for a language code; unknown codes pass through
pub fn language_name(code: &str) -> &str {
    LANGUAGE_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map_or(code, |(_, name)| *name)
}

/// max(4096, min(floor(len * 0.75), 16000)), len in bytes
pub fn max_tokens_for(text: &str) -> usize {
    let estimate = text.len() * 3 / 4;
    estimate.clamp(MIN_MAX_TOKENS, MAX_MAX_TOKENS)
}

fn user_prompt(text: &str, source_lang: &str, target_lang: &str) -> String {
    format!(
        "Translate the following HTML from {} to {}. Keep HTML structure (div, p, ul, b, etc). \
Do NOT translate class/ID attributes. Return ONLY raw HTML, NO markdown, NO backticks. \
Translate EVERYTHING completely.\n\n{}",
        language_name(source_lang),
        language_name(target_lang),
        text
    )
}

pub(crate) fn request_body(
    text: &str,
    source_lang: &str,
    target_lang: &str,
    model: &str,
) -> serde_json::Value {
    serde_json::json!({
        "model": model,
        "max_tokens": max_tokens_for(text),
        "messages": [
            {"role": "system", "content": SYSTEM_PROMPT},
            {"role": "user", "content": user_prompt(text, source_lang, target_lang)}
        ]
    })
}

fn leading_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^```(?:html)?\s*").expect("valid fence regex"))
}

fn trailing_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*```\s*$").expect("valid fence regex"))
}

/// Remove a wrapping markdown code fence the model added despite instructions
pub fn strip_code_fences(content: &str) -> String {
    let trimmed = content.trim();
    let without_lead = leading_fence().replace(trimmed, "");
    trailing_fence().replace(&without_lead, "").into_owned()
}

/// Turn an HTTP status and body into translated text or a typed failure
pub(crate) fn parse_completion(status: StatusCode, body: &str) -> Result<String, TranslateError> {
    let parsed: CompletionResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) if status.is_success() => {
            return Err(TranslateError::EngineError(format!(
                "Unreadable engine response: {}",
                e
            )))
        }
        Err(_) => return Err(TranslateError::EngineError(format!("HTTP {}", status))),
    };

    if let Some(error) = parsed.error {
        return Err(TranslateError::EngineError(error.message));
    }
    if !status.is_success() {
        return Err(TranslateError::EngineError(format!("HTTP {}", status)));
    }

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| TranslateError::EngineError("Response contained no choices".to_string()))?;

    if choice.finish_reason.as_deref() == Some("length") {
        return Err(TranslateError::TruncatedOutput);
    }

    let content = choice
        .message
        .and_then(|m| m.content)
        .unwrap_or_default();
    Ok(strip_code_fences(&content))
}

impl OpenAiTranslationClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, TranslateError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| TranslateError::TransportFailure(e.to_string()))?;

        Ok(Self { http, config })
    }

    fn api_key(&self) -> Result<&str, TranslateError> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(TranslateError::MissingCredential)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl TranslationClient for OpenAiTranslationClient {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
        model: &str,
    ) -> Result<String, TranslateError> {
        let api_key = self.api_key()?;
        let body = request_body(text, source_lang, target_lang, model);

        debug!(
            len = text.len(),
            max_tokens = max_tokens_for(text),
            model,
            "Sending chunk to engine"
        );

        let response = self
            .http
            .post(self.endpoint("chat/completions"))
            .bearer_auth(api_key)
            .timeout(self.config.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| TranslateError::TransportFailure(e.to_string()))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| TranslateError::TransportFailure(e.to_string()))?;

        let result = parse_completion(status, &raw);
        if let Err(e) = &result {
            warn!(status = status.as_u16(), error = %e, "Engine call failed");
        }
        result
    }

    async fn check_connection(&self) -> Result<(), TranslateError> {
        let api_key = self.api_key()?;

        let response = self
            .http
            .get(self.endpoint("models"))
            .bearer_auth(api_key)
            .timeout(self.config.check_timeout)
            .send()
            .await
            .map_err(|e| TranslateError::TransportFailure(e.to_string()))?;

        match response.status() {
            StatusCode::OK => Ok(()),
            code => Err(TranslateError::EngineError(format!("API Error: {}", code.as_u16()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::serve_once;

    #[test]
    fn test_token_budget_bounds() {
        assert_eq!(max_tokens_for("short"), 4096);
        assert_eq!(max_tokens_for(&"x".repeat(12_000)), 9000);
        assert_eq!(max_tokens_for(&"x".repeat(40_000)), 16000);
    }

    #[test]
    fn test_language_names() {
        assert_eq!(language_name("uk"), "Ukrainian");
        assert_eq!(language_name("nl"), "Dutch");
        assert_eq!(language_name("pt"), "pt");
    }

    #[test]
    fn test_request_body_shape() {
        let body = request_body("<p>Hallo</p>", "de", "fr", "gpt-4o-mini");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["messages"][0]["role"], "system");
        let user = body["messages"][1]["content"].as_str().unwrap();
        assert!(user.starts_with("Translate the following HTML from German to French."));
        assert!(user.ends_with("\n\n<p>Hallo</p>"));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```html\n<p>x</p>\n```"), "<p>x</p>");
        assert_eq!(strip_code_fences("```HTML <p>x</p>```  "), "<p>x</p>");
        assert_eq!(strip_code_fences("```\n<p>x</p>\n```"), "<p>x</p>");
        assert_eq!(strip_code_fences("  <p>x</p>\n"), "<p>x</p>");
    }

    #[test]
    fn test_parse_success() {
        let body = r#"{"choices":[{"message":{"content":"```html\n<p>Bonjour</p>\n```"},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_completion(StatusCode::OK, body).unwrap(), "<p>Bonjour</p>");
    }

    #[test]
    fn test_parse_failures() {
        let truncated = r#"{"choices":[{"message":{"content":"<p>Bon"},"finish_reason":"length"}]}"#;
        assert_eq!(
            parse_completion(StatusCode::OK, truncated),
            Err(TranslateError::TruncatedOutput)
        );

        let engine = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(
            parse_completion(StatusCode::UNAUTHORIZED, engine),
            Err(TranslateError::EngineError("Incorrect API key provided".to_string()))
        );

        assert_eq!(
            parse_completion(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>"),
            Err(TranslateError::EngineError("HTTP 502 Bad Gateway".to_string()))
        );
    }

    #[tokio::test]
    async fn test_missing_credential_short_circuits() {
        let client = OpenAiTranslationClient::new(OpenAiConfig {
            api_key: Some("   ".to_string()),
            ..OpenAiConfig::default()
        })
        .unwrap();

        assert_eq!(
            client.translate("<p>x</p>", "de", "en", "m").await,
            Err(TranslateError::MissingCredential)
        );
        assert_eq!(
            client.check_connection().await,
            Err(TranslateError::MissingCredential)
        );
    }

    #[tokio::test]
    async fn test_translate_against_local_server() {
        let (base_url, request) = serve_once(
            200,
            r#"{"choices":[{"message":{"content":"<p>Hello</p>"},"finish_reason":"stop"}]}"#,
        )
        .await;
        let client = OpenAiTranslationClient::new(OpenAiConfig {
            base_url,
            api_key: Some("sk-test".to_string()),
            ..OpenAiConfig::default()
        })
        .unwrap();

        let translated = client.translate("<p>Hallo</p>", "de", "en", "m").await.unwrap();
        assert_eq!(translated, "<p>Hello</p>");

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /chat/completions"));
        assert!(request.to_lowercase().contains("authorization: bearer sk-test"));
    }

    #[tokio::test]
    async fn test_unreachable_engine_is_transport_failure() {
        let client = OpenAiTranslationClient::new(OpenAiConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: Some("sk-test".to_string()),
            ..OpenAiConfig::default()
        })
        .unwrap();

        let err = client.translate("<p>x</p>", "de", "en", "m").await.unwrap_err();
        assert!(matches!(err, TranslateError::TransportFailure(_)));
    }
}
