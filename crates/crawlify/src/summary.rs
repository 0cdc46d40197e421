//! Page summaries through an OpenRouter-compatible chat completion API
//!
//! Every outcome is a [`FormatPayload`]; failures are soft and never abort
//! the surrounding crawl.

use crate::config::SummarySettings;
use crate::types::FormatPayload;
use crate::DEFAULT_USER_AGENT;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Content type of a generated summary
pub const SUMMARY_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Only this many characters of the source are sent upstream
pub const SUMMARY_INPUT_CHARS: usize = 4000;

/// Provider request timeout
pub const SUMMARY_TIMEOUT: Duration = Duration::from_secs(20);

const SYSTEM_PROMPT: &str =
    "You summarize webpage content into concise English responses no longer than two sentences.";

const EMPTY_CONTENT_MESSAGE: &str = "Summary is unavailable for empty content.";
const MISSING_KEY_MESSAGE: &str = "Summary is unavailable because OpenRouter API key is missing.";
const RATE_LIMITED_MESSAGE: &str = "Summary is temporarily rate limited. Please try again soon.";
const GENERIC_FAILURE_MESSAGE: &str = "Failed to generate summary.";

/// Generates short summaries of page content
#[derive(Debug, Clone, Default)]
pub struct Summarizer {
    settings: SummarySettings,
    timeout: Option<Duration>,
}

impl Summarizer {
    pub fn new(settings: SummarySettings) -> Self {
        Self {
            settings,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn api_key(&self) -> Option<&str> {
        self.settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Summarize `content` taken from `url`
    pub async fn summarize(&self, url: &str, content: &str) -> FormatPayload {
        let content = content.trim();
        if content.is_empty() {
            return FormatPayload::failed(EMPTY_CONTENT_MESSAGE);
        }

        let Some(api_key) = self.api_key() else {
            return FormatPayload::failed(MISSING_KEY_MESSAGE);
        };

        match self.request(url, content, api_key).await {
            Ok(summary) => FormatPayload::Content {
                content: summary,
                content_type: Some(SUMMARY_CONTENT_TYPE.to_string()),
            },
            Err(message) => {
                warn!(url = %url, "Summary failed: {}", message);
                FormatPayload::failed(message)
            }
        }
    }

    async fn request(&self, url: &str, content: &str, api_key: &str) -> Result<String, String> {
        let excerpt: String = content.chars().take(SUMMARY_INPUT_CHARS).collect();
        let payload = json!({
            "model": self.settings.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!(
                        "Summarize the following content from {} in no more than two sentences:\n\n{}",
                        url, excerpt
                    ),
                },
            ],
        });

        let client = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(self.timeout.unwrap_or(SUMMARY_TIMEOUT))
            .build()
            .map_err(|e| {
                warn!("Failed to build summary client: {}", e);
                GENERIC_FAILURE_MESSAGE.to_string()
            })?;

        let endpoint = format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );
        let response = client
            .post(&endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                debug!("Summary request failed: {}", e);
                GENERIC_FAILURE_MESSAGE.to_string()
            })?;

        let status = response.status();
        let body: Option<Value> = response.json().await.ok();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(RATE_LIMITED_MESSAGE.to_string());
        }
        if !status.is_success() {
            return Err(match body.as_ref().and_then(provider_message) {
                Some(detail) => format!("Failed to generate summary: {}", detail),
                None => GENERIC_FAILURE_MESSAGE.to_string(),
            });
        }

        body.and_then(|b| serde_json::from_value::<ChatCompletion>(b).ok())
            .and_then(|completion| completion.text())
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
    }
}

/// Provider error detail: `error.metadata.raw`, else `error.message`
fn provider_message(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    error
        .pointer("/metadata/raw")
        .and_then(Value::as_str)
        .or_else(|| error.get("message").and_then(Value::as_str))
        .map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<CompletionMessage>,
}

/// Shapes a provider may return for `choices[0].message`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CompletionMessage {
    /// Bare string
    Text(String),
    /// Object whose `content` is a string, a fragment list, or absent
    Structured {
        #[serde(default)]
        content: Option<MessageContent>,
        #[serde(flatten)]
        fields: Map<String, Value>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Fragments(Vec<Value>),
    Other(serde::de::IgnoredAny),
}

/// A `{"type": "text", "text": ...}` fragment
#[derive(Debug, Deserialize)]
struct TextFragment {
    #[serde(rename = "type")]
    kind: String,
    text: String,
}

impl ChatCompletion {
    fn text(self) -> Option<String> {
        self.choices.into_iter().next()?.message?.into_text()
    }
}

impl CompletionMessage {
    fn into_text(self) -> Option<String> {
        match self {
            CompletionMessage::Text(text) => Some(text),
            CompletionMessage::Structured { content, fields } => match content {
                Some(MessageContent::Text(text)) => Some(text),
                Some(MessageContent::Fragments(items)) => {
                    join_fragments(items).or_else(|| join_fragments(fields.into_values()))
                }
                Some(MessageContent::Other(_)) | None => join_fragments(fields.into_values()),
            },
        }
    }
}

/// Join the text of every typed text fragment with blank lines
fn join_fragments(values: impl IntoIterator<Item = Value>) -> Option<String> {
    let texts: Vec<String> = values
        .into_iter()
        .filter_map(|v| serde_json::from_value::<TextFragment>(v).ok())
        .filter(|f| f.kind == "text")
        .map(|f| f.text)
        .collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn extract(body: Value) -> Option<String> {
        serde_json::from_value::<ChatCompletion>(body)
            .ok()
            .and_then(ChatCompletion::text)
    }

    fn summarizer(server: &MockServer, key: Option<&str>) -> Summarizer {
        Summarizer::new(SummarySettings {
            api_key: key.map(str::to_string),
            base_url: server.uri(),
            ..Default::default()
        })
    }

    #[test]
    fn test_extract_string_content() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": "Short."}}]});
        assert_eq!(extract(body).as_deref(), Some("Short."));
    }

    #[test]
    fn test_extract_plain_string_message() {
        let body = json!({"choices": [{"message": "Plain."}]});
        assert_eq!(extract(body).as_deref(), Some("Plain."));
    }

    #[test]
    fn test_extract_fragment_array() {
        let body = json!({"choices": [{"message": {"content": [
            {"type": "text", "text": "One."},
            {"type": "image_url", "image_url": "x"},
            {"type": "text", "text": "Two."}
        ]}}]});
        assert_eq!(extract(body).as_deref(), Some("One.\n\nTwo."));
    }

    #[test]
    fn test_extract_fragment_mapping() {
        let body = json!({"choices": [{"message": {
            "role": "assistant",
            "a": {"type": "text", "text": "First."},
            "b": {"type": "text", "text": "Second."}
        }}]});
        assert_eq!(extract(body).as_deref(), Some("First.\n\nSecond."));
    }

    #[test]
    fn test_extract_unrecognized_content_uses_fragments() {
        let body = json!({"choices": [{"message": {
            "content": {"parts": 2},
            "extra": {"type": "text", "text": "Fallback."}
        }}]});
        assert_eq!(extract(body).as_deref(), Some("Fallback."));
    }

    #[test]
    fn test_extract_missing_message() {
        assert_eq!(extract(json!({"choices": []})), None);
        assert_eq!(extract(json!({"choices": [{}]})), None);
        assert_eq!(extract(json!({"choices": [{"message": {"content": null}}]})), None);
    }

    #[test]
    fn test_provider_message_prefers_raw() {
        let body = json!({"error": {"message": "outer", "metadata": {"raw": "inner"}}});
        assert_eq!(provider_message(&body).as_deref(), Some("inner"));
        let body = json!({"error": {"message": "outer"}});
        assert_eq!(provider_message(&body).as_deref(), Some("outer"));
        assert_eq!(provider_message(&json!({"detail": "x"})), None);
    }

    #[tokio::test]
    async fn test_empty_content() {
        let server = MockServer::start().await;
        let payload = summarizer(&server, Some("key"))
            .summarize("https://example.com", "  \n ")
            .await;
        assert_eq!(payload.failure_message(), Some(EMPTY_CONTENT_MESSAGE));
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        for key in [None, Some("   ")] {
            let payload = summarizer(&server, key)
                .summarize("https://example.com", "Some text")
                .await;
            assert_eq!(payload.failure_message(), Some(MISSING_KEY_MESSAGE));
        }
    }

    #[tokio::test]
    async fn test_success_trims_and_truncates_input() {
        let server = MockServer::start().await;
        let long = "a".repeat(SUMMARY_INPUT_CHARS + 500);
        let expected_user = format!(
            "Summarize the following content from https://example.com in no more than two sentences:\n\n{}",
            "a".repeat(SUMMARY_INPUT_CHARS)
        );

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(json!({
                "model": "google/gemini-2.5-flash-lite",
                "messages": [
                    {"role": "system", "content": SYSTEM_PROMPT},
                    {"role": "user", "content": expected_user}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "  A page about letters.\n"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let payload = summarizer(&server, Some("secret"))
            .summarize("https://example.com", &long)
            .await;
        assert_eq!(
            payload,
            FormatPayload::Content {
                content: "A page about letters.".to_string(),
                content_type: Some(SUMMARY_CONTENT_TYPE.to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "slow down"}
            })))
            .mount(&server)
            .await;

        let payload = summarizer(&server, Some("key"))
            .summarize("https://example.com", "text")
            .await;
        assert_eq!(payload.failure_message(), Some(RATE_LIMITED_MESSAGE));
    }

    #[tokio::test]
    async fn test_provider_error_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"message": "Provider returned error", "metadata": {"raw": "model overloaded"}}
            })))
            .mount(&server)
            .await;

        let payload = summarizer(&server, Some("key"))
            .summarize("https://example.com", "text")
            .await;
        assert_eq!(
            payload.failure_message(),
            Some("Failed to generate summary: model overloaded")
        );
    }

    #[tokio::test]
    async fn test_provider_error_without_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;

        let payload = summarizer(&server, Some("key"))
            .summarize("https://example.com", "text")
            .await;
        assert_eq!(payload.failure_message(), Some(GENERIC_FAILURE_MESSAGE));
    }

    #[tokio::test]
    async fn test_empty_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "   "}}]
            })))
            .mount(&server)
            .await;

        let payload = summarizer(&server, Some("key"))
            .summarize("https://example.com", "text")
            .await;
        assert_eq!(payload.failure_message(), Some(GENERIC_FAILURE_MESSAGE));
    }

    #[tokio::test]
    async fn test_unreachable_provider() {
        let summarizer = Summarizer::new(SummarySettings {
            api_key: Some("key".to_string()),
            base_url: "http://127.0.0.1:1".to_string(),
            ..Default::default()
        })
        .with_timeout(Duration::from_secs(2));

        let payload = summarizer.summarize("https://example.com", "text").await;
        assert_eq!(payload.failure_message(), Some(GENERIC_FAILURE_MESSAGE));
    }
}
