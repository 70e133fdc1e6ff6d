//! Chat-completion client used by both analysis stages.

use std::time::Duration;

use async_trait::async_trait;
use painradar_core::AppConfig;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::error::RadarError;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

const APP_NAME: &str = "Pain Radar";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A model endpoint that turns a conversation into text.
///
/// Implementations must return an error (never an empty string) when the
/// endpoint answers with a non-2xx status or the transport fails. Callers treat
/// the returned text as untrusted.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn invoke(
        &self,
        model: &str,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: Option<f32>,
    ) -> Result<String, RadarError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// OpenRouter (OpenAI-compatible) chat completions over HTTPS.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    app_name: Option<String>,
}

impl OpenRouterClient {
    /// # Errors
    ///
    /// Returns [`RadarError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, RadarError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            app_name: None,
        })
    }

    /// Client configured from the environment, or `None` when
    /// `OPENROUTER_API_KEY` is unset.
    ///
    /// # Errors
    ///
    /// Returns [`RadarError::Http`] if the HTTP client cannot be built.
    pub fn from_app_config(app: &AppConfig) -> Result<Option<Self>, RadarError> {
        let Some(key) = app.openrouter_api_key.as_deref() else {
            return Ok(None);
        };
        let client = Self::new(key, Duration::from_secs(app.inference_timeout_secs))?
            .with_base_url(app.inference_base_url.clone())
            .with_app_name(APP_NAME);
        Ok(Some(client))
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sent as `X-Title` for attribution on the OpenRouter dashboard.
    #[must_use]
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    fn headers(&self) -> Result<HeaderMap, RadarError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| RadarError::Validation("API key is not a valid header value".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(val) = self.app_name.as_deref().and_then(|n| HeaderValue::from_str(n).ok()) {
            headers.insert("X-Title", val);
        }
        Ok(headers)
    }
}

#[async_trait]
impl InferenceClient for OpenRouterClient {
    async fn invoke(
        &self,
        model: &str,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: Option<f32>,
    ) -> Result<String, RadarError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model,
            messages,
            max_tokens,
            temperature,
        };
        tracing::debug!(model, max_tokens, "inference request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RadarError::Inference {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|source| RadarError::Deserialize {
                context: "chat completion".to_string(),
                source,
            })?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| RadarError::MalformedResponse("no content in completion".to_string()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    type Script = dyn Fn(&str, &[ChatMessage]) -> Result<String, RadarError> + Send + Sync;

    /// Inference fake driven by a closure over `(model, messages)`.
    #[derive(Clone)]
    pub(crate) struct ScriptedInference {
        script: Arc<Script>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedInference {
        pub(crate) fn new(
            script: impl Fn(&str, &[ChatMessage]) -> Result<String, RadarError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                script: Arc::new(script),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub(crate) fn replying(text: &str) -> Self {
            let text = text.to_string();
            Self::new(move |_, _| Ok(text.clone()))
        }

        pub(crate) fn failing() -> Self {
            Self::new(|_, _| {
                Err(RadarError::Inference {
                    status: 503,
                    body: "upstream unavailable".to_string(),
                })
            })
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl InferenceClient for ScriptedInference {
        async fn invoke(
            &self,
            model: &str,
            messages: &[ChatMessage],
            _max_tokens: u32,
            _temperature: Option<f32>,
        ) -> Result<String, RadarError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.script)(model, messages)
        }
    }

    fn client(server: &MockServer) -> OpenRouterClient {
        OpenRouterClient::new("sk-test", Duration::from_secs(5))
            .expect("client builds")
            .with_base_url(server.uri())
            .with_app_name(APP_NAME)
    }

    #[tokio::test]
    async fn invoke_returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(header("x-title", "Pain Radar"))
            .and(body_partial_json(serde_json::json!({
                "model": "anthropic/claude-3-haiku",
                "max_tokens": 200,
                "messages": [{"role": "user", "content": "score these"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "[90, 10]"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = client(&server)
            .invoke(
                "anthropic/claude-3-haiku",
                &[ChatMessage::user("score these")],
                200,
                Some(0.3),
            )
            .await
            .expect("invoke");
        assert_eq!(text, "[90, 10]");
    }

    #[tokio::test]
    async fn non_success_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(402).set_body_string("insufficient credits"))
            .mount(&server)
            .await;

        let err = client(&server)
            .invoke("m", &[ChatMessage::user("x")], 10, None)
            .await
            .expect_err("402 fails");
        assert!(matches!(
            err,
            RadarError::Inference { status: 402, ref body } if body == "insufficient credits"
        ));
    }

    #[tokio::test]
    async fn empty_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .invoke("m", &[ChatMessage::user("x")], 10, None)
            .await
            .expect_err("no choices");
        assert!(matches!(err, RadarError::MalformedResponse(_)));
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_value(ChatMessage::user("be terse")).expect("serialize");
        assert_eq!(json, serde_json::json!({"role": "user", "content": "be terse"}));
    }
}
