//! Gemini `generateContent` transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{GenerationError, GenerationRequest, ModelTransport};

const USER_AGENT: &str = concat!("newsroom/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const TOP_K: u32 = 40;
const TOP_P: f32 = 0.95;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestBody<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<[Tool; 1]>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a Value>,
}

#[derive(Serialize)]
struct Tool {
    google_search: EmptyObject,
}

#[derive(Serialize)]
struct EmptyObject {}

#[derive(Deserialize)]
struct ResponseBody {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl<'a> RequestBody<'a> {
    fn from_request(request: &'a GenerationRequest) -> Self {
        Self {
            contents: [Content {
                parts: [Part {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                top_k: TOP_K,
                top_p: TOP_P,
                max_output_tokens: request.max_output_tokens,
                response_mime_type: request
                    .response_schema
                    .as_ref()
                    .map(|_| "application/json"),
                response_schema: request.response_schema.as_ref(),
            },
            tools: request.search.then(|| {
                [Tool {
                    google_search: EmptyObject {},
                }]
            }),
        }
    }
}

impl ResponseBody {
    /// Text of the first candidate, with all of its text parts joined.
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// HTTP transport for the Gemini models API.
pub struct GeminiTransport {
    client: Client,
    base_url: String,
}

impl GeminiTransport {
    /// `base_url` is the models collection, e.g.
    /// `https://generativelanguage.googleapis.com/v1beta/models`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/{model}:generateContent", self.base_url)
    }
}

fn map_send_error(error: reqwest::Error) -> GenerationError {
    if error.is_timeout() {
        GenerationError::Timeout
    } else if error.is_connect() {
        GenerationError::Transport(format!("connection error: {error}"))
    } else {
        GenerationError::Transport(error.to_string())
    }
}

#[async_trait]
impl ModelTransport for GeminiTransport {
    async fn attempt(
        &self,
        model: &str,
        credential: &str,
        request: &GenerationRequest,
    ) -> Result<String, GenerationError> {
        let body = RequestBody::from_request(request);
        debug!(model, search = request.search, "sending generateContent");

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", credential)
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GenerationError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Http {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let parsed: ResponseBody = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout
            } else {
                GenerationError::Transport(format!("unreadable response body: {e}"))
            }
        })?;

        parsed.into_text().ok_or(GenerationError::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reply(text: &str) -> Value {
        json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
    }

    async fn transport(server: &MockServer) -> GeminiTransport {
        GeminiTransport::new(&format!("{}/models/", server.uri()), Duration::from_secs(5))
            .expect("client")
    }

    #[tokio::test]
    async fn returns_first_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-test:generateContent"))
            .and(header("x-goog-api-key", "key-1"))
            .and(body_partial_json(json!({
                "contents": [{"parts": [{"text": "hello"}]}],
                "generationConfig": {"topK": 40, "maxOutputTokens": 8192}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("こんにちは")))
            .expect(1)
            .mount(&server)
            .await;

        let t = transport(&server).await;
        let text = t
            .attempt("gemini-test", "key-1", &GenerationRequest::text("hello"))
            .await
            .expect("success");
        assert_eq!(text, "こんにちは");
    }

    #[tokio::test]
    async fn schema_and_search_reach_the_wire() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "generationConfig": {
                    "responseMimeType": "application/json",
                    "responseSchema": {"type": "OBJECT"}
                },
                "tools": [{"google_search": {}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("{}")))
            .expect(1)
            .mount(&server)
            .await;

        let t = transport(&server).await;
        let req = GenerationRequest::json("p", json!({"type": "OBJECT"})).with_search();
        assert_eq!(t.attempt("m", "k", &req).await.expect("success"), "{}");
    }

    #[test]
    fn plain_request_omits_optional_fields() {
        let req = GenerationRequest::text("p");
        let body = serde_json::to_value(RequestBody::from_request(&req)).expect("serialize");
        assert!(body.get("tools").is_none());
        assert!(body["generationConfig"].get("responseMimeType").is_none());
        assert!(body["generationConfig"].get("responseSchema").is_none());
    }

    #[tokio::test]
    async fn status_429_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let t = transport(&server).await;
        let err = t
            .attempt("m", "k", &GenerationRequest::text("p"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::RateLimited));
    }

    #[tokio::test]
    async fn other_status_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let t = transport(&server).await;
        let err = t
            .attempt("m", "k", &GenerationRequest::text("p"))
            .await
            .unwrap_err();
        match err {
            GenerationError::Http { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_candidates_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let t = transport(&server).await;
        let err = t
            .attempt("m", "k", &GenerationRequest::text("p"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Empty));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(reply("late"))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let t = GeminiTransport::new(&server.uri(), Duration::from_millis(200)).expect("client");
        let err = t
            .attempt("m", "k", &GenerationRequest::text("p"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Timeout), "{err:?}");
    }

    #[test]
    fn multi_part_candidates_are_joined() {
        let body: ResponseBody = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "前半"}, {"text": "後半"}]}}]
        }))
        .expect("parse");
        assert_eq!(body.into_text().as_deref(), Some("前半後半"));
    }
}
