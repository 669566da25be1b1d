//! Google Gemini (`generativelanguage.googleapis.com`) client.
//!
//! Only the two REST calls quill needs are implemented: `generateContent` for
//! one-shot generation and `models.list` for the `list-models` command.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Generator;
use crate::error::{BackendError, ConfigError};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

const API_KEY_HEADER: &str = "x-goog-api-key";
const GENERATE_METHOD: &str = "generateContent";
const LIST_PAGE_SIZE: &str = "1000";

/// Construction options for [`GeminiClient`].
#[derive(Debug, Clone)]
pub struct GeminiOptions {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Whole-request timeout enforced by the HTTP client.
    pub timeout: Duration,
}

impl Default for GeminiOptions {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_owned(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Gemini REST client bound to one model.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Build a client, failing fast when no API key is available.
    pub fn new(opts: GeminiOptions) -> Result<Self, ConfigError> {
        let api_key = opts
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingCredential {
                backend: "gemini".into(),
                hint: "GEMINI_API_KEY or GOOGLE_API_KEY".into(),
            })?;
        // `models.list` reports resource names (`models/gemini-1.5-flash`);
        // the URL template already carries the `models/` segment.
        let model = opts.model.trim();
        let model = model.strip_prefix("models/").unwrap_or(model).to_owned();
        if model.is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        let http = Client::builder()
            .timeout(opts.timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            http,
            api_key,
            model,
            base_url: opts.base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn check_credential(&self) -> Result<(), BackendError> {
        if self.api_key.trim().is_empty() {
            return Err(BackendError::MissingCredential);
        }
        Ok(())
    }

    /// List every model visible to the key, following pagination.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, BackendError> {
        self.check_credential()?;
        let endpoint = format!("{}/v1beta/models", self.base_url);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![("pageSize", LIST_PAGE_SIZE.to_owned())];
            if let Some(token) = page_token.take() {
                params.push(("pageToken", token));
            }
            let url = Url::parse_with_params(&endpoint, &params)
                .map_err(|e| BackendError::Transport(format!("invalid url {endpoint}: {e}")))?;

            let resp = self
                .http
                .get(url)
                .header(API_KEY_HEADER, &self.api_key)
                .send()
                .await?;
            let page: ListModelsResponse = read_json(resp).await?;
            models.extend(page.models);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(count = models.len(), "listed gemini models");
        Ok(models)
    }
}

#[async_trait]
impl Generator for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> Result<String, BackendError> {
        self.check_credential()?;

        let url = format!(
            "{}/v1beta/models/{}:{}",
            self.base_url, self.model, GENERATE_METHOD
        );
        let body = GenerateContentRequest {
            system_instruction: system_instruction.map(Content::text),
            contents: vec![Content::user(prompt)],
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "gemini generateContent");

        let resp = self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;
        let reply: GenerateContentResponse = read_json(resp).await?;
        reply.into_text()
    }
}

/// Read a JSON body, turning non-2xx statuses into [`BackendError::Api`].
async fn read_json<T: for<'de> Deserialize<'de>>(
    resp: reqwest::Response,
) -> Result<T, BackendError> {
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(api_error(status, &text));
    }
    serde_json::from_str(&text).map_err(|e| BackendError::MalformedReply(e.to_string()))
}

fn api_error(status: StatusCode, body: &str) -> BackendError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|env| env.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_owned()
            } else {
                body.trim().to_owned()
            }
        });
    BackendError::Api { status: status.as_u16(), message }
}

// ── Wire types ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(text: &str) -> Self {
        Self { role: None, parts: vec![Part { text: Some(text.to_owned()) }] }
    }

    fn user(text: &str) -> Self {
        Self { role: Some("user".into()), ..Self::text(text) }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Result<String, BackendError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(BackendError::Blocked { reason });
        }
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::MalformedReply("reply has no candidates".into()))?;

        let texts: Vec<String> = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if texts.is_empty() {
            return Err(match candidate.finish_reason {
                Some(reason) if reason != "STOP" => BackendError::Blocked { reason },
                _ => BackendError::MalformedReply("candidate has no text parts".into()),
            });
        }
        Ok(texts.concat())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

/// One entry of the `models.list` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Resource name, e.g. `models/gemini-1.5-flash`.
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    /// Whether the model can serve `generateContent` calls.
    pub fn supports_generation(&self) -> bool {
        self.supported_generation_methods.iter().any(|m| m == GENERATE_METHOD)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client(base_url: &str) -> GeminiClient {
        GeminiClient::new(GeminiOptions {
            api_key: Some("test-key".into()),
            model: "gemini-test".into(),
            base_url: base_url.to_owned(),
            timeout: Duration::from_secs(5),
        })
        .expect("client")
    }

    #[test]
    fn missing_key_fails_fast() {
        let err = GeminiClient::new(GeminiOptions::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { .. }));

        let err = GeminiClient::new(GeminiOptions {
            api_key: Some("   ".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { .. }));
    }

    #[test]
    fn blank_model_is_rejected() {
        let err = GeminiClient::new(GeminiOptions {
            api_key: Some("k".into()),
            model: " ".into(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyModel));
    }

    #[test]
    fn bare_resource_prefix_is_rejected() {
        let err = GeminiClient::new(GeminiOptions {
            api_key: Some("k".into()),
            model: "models/".into(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyModel));
    }

    #[tokio::test]
    async fn resource_name_model_hits_the_same_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .with_status(200)
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"ok"}]}}]}"#)
            .create_async()
            .await;

        let c = GeminiClient::new(GeminiOptions {
            api_key: Some("test-key".into()),
            model: "models/gemini-test".into(),
            base_url: server.url(),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        assert_eq!(c.model(), "gemini-test");
        assert_eq!(c.generate("hello", None).await.unwrap(), "ok");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn blank_key_is_rejected_at_call_time() {
        let mut c = client("http://127.0.0.1:9");
        c.api_key = String::new();
        let err = c.generate("hi", None).await.unwrap_err();
        assert!(matches!(err, BackendError::MissingCredential));
    }

    #[tokio::test]
    async fn generate_sends_instruction_and_joins_parts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .match_header(API_KEY_HEADER, "test-key")
            .match_body(Matcher::Json(json!({
                "systemInstruction": { "parts": [{ "text": "be kind" }] },
                "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "candidates": [{
                        "content": { "role": "model", "parts": [{ "text": "맑고 " }, { "text": "고요한" }] },
                        "finishReason": "STOP"
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let text = client(&server.url()).generate("hello", Some("be kind")).await.unwrap();
        assert_eq!(text, "맑고 고요한");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn generate_without_instruction_omits_field() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .match_body(Matcher::Json(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }]
            })))
            .with_status(200)
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"ok"}]}}]}"#)
            .create_async()
            .await;

        assert_eq!(client(&server.url()).generate("hello", None).await.unwrap(), "ok");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn quota_error_carries_backend_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .with_status(429)
            .with_body(
                json!({
                    "error": {
                        "code": 429,
                        "message": "Resource has been exhausted (e.g. check quota).",
                        "status": "RESOURCE_EXHAUSTED"
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let err = client(&server.url()).generate("hello", None).await.unwrap_err();
        match &err {
            BackendError::Api { status, message } => {
                assert_eq!(*status, 429);
                assert!(message.contains("Resource has been exhausted"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn non_json_error_body_is_kept_verbatim() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .with_status(502)
            .with_body("upstream gateway exploded")
            .create_async()
            .await;

        let err = client(&server.url()).generate("x", None).await.unwrap_err();
        assert!(err.to_string().contains("upstream gateway exploded"));
    }

    #[tokio::test]
    async fn blocked_prompt_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .with_status(200)
            .with_body(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
            .create_async()
            .await;

        let err = client(&server.url()).generate("x", None).await.unwrap_err();
        assert!(matches!(err, BackendError::Blocked { ref reason } if reason == "SAFETY"));
    }

    #[tokio::test]
    async fn empty_candidates_are_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .with_status(200)
            .with_body(r#"{"candidates":[]}"#)
            .create_async()
            .await;

        let err = client(&server.url()).generate("x", None).await.unwrap_err();
        assert!(matches!(err, BackendError::MalformedReply(_)));
    }

    #[tokio::test]
    async fn list_models_follows_pages() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/v1beta/models")
            .match_query(Matcher::Exact(format!("pageSize={LIST_PAGE_SIZE}")))
            .with_status(200)
            .with_body(
                json!({
                    "models": [
                        { "name": "models/gemini-1.5-flash", "supportedGenerationMethods": ["generateContent", "countTokens"] },
                        { "name": "models/embedding-001", "supportedGenerationMethods": ["embedContent"] }
                    ],
                    "nextPageToken": "page-2"
                })
                .to_string(),
            )
            .create_async()
            .await;
        let second = server
            .mock("GET", "/v1beta/models")
            .match_query(Matcher::Exact(format!("pageSize={LIST_PAGE_SIZE}&pageToken=page-2")))
            .with_status(200)
            .with_body(
                json!({
                    "models": [
                        { "name": "models/gemini-1.5-pro", "supportedGenerationMethods": ["generateContent"] }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let models = client(&server.url()).list_models().await.unwrap();
        let names: Vec<&str> = models
            .iter()
            .filter(|m| m.supports_generation())
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, ["models/gemini-1.5-flash", "models/gemini-1.5-pro"]);
        first.assert_async().await;
        second.assert_async().await;
    }
}
