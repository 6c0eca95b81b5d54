//! Generation-service client with model fallback and credential rotation.
//!
//! The pipeline only sees [`GenerationService`]: one request in, one usable
//! result (or a terminal [`GenerationError`]) out. [`RotatingClient`] is the
//! production implementation. It walks an ordered list of models per
//! [`ModelTier`], rotates credentials on rate limits, and hands each single
//! attempt to a [`ModelTransport`] such as [`GeminiTransport`].

pub mod error;
mod gemini;
pub mod json;
mod rotation;

use async_trait::async_trait;
use serde_json::Value;

use newsroom_shared::{GeminiConfig, NewsroomError, resolve_api_keys};

pub use error::GenerationError;
pub use gemini::GeminiTransport;
pub use rotation::{FallbackPolicy, RotatingClient};

/// Default sampling temperature for free text.
const TEXT_TEMPERATURE: f32 = 0.9;

/// Default sampling temperature for schema-constrained output.
const JSON_TEMPERATURE: f32 = 0.7;

/// Default output budget.
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// Which model list a request rotates through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelTier {
    /// Cheap, fast models: planning, titles, metadata, revisions.
    Light,
    /// Higher-quality models: search-augmented drafting.
    Heavy,
}

/// One call to the generation service.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// When set, the response must be JSON matching this schema.
    pub response_schema: Option<Value>,
    /// Let the model ground its answer in web search results.
    pub search: bool,
    pub tier: ModelTier,
}

impl GenerationRequest {
    /// Free-text request on the light tier.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: TEXT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            response_schema: None,
            search: false,
            tier: ModelTier::Light,
        }
    }

    /// Schema-constrained request on the light tier.
    pub fn json(prompt: impl Into<String>, schema: Value) -> Self {
        Self {
            temperature: JSON_TEMPERATURE,
            response_schema: Some(schema),
            ..Self::text(prompt)
        }
    }

    /// Enable search augmentation. Search requests run on the heavy tier.
    pub fn with_search(mut self) -> Self {
        self.search = true;
        self.tier = ModelTier::Heavy;
        self
    }

    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = max;
        self
    }

    /// Whether the caller expects a parsed JSON value back.
    pub fn expects_json(&self) -> bool {
        self.response_schema.is_some()
    }
}

/// A usable result.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    /// Model that produced the result.
    pub model: String,
    /// Raw response text.
    pub text: String,
    /// Parsed JSON, present iff the request carried a schema.
    pub json: Option<Value>,
}

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// The generation capability the pipeline depends on.
///
/// Implementations own every retry and fallback decision; an `Err` means no
/// usable result exists for this request.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generated, GenerationError>;
}

/// One attempt against one model with one credential. No retries.
#[async_trait]
pub trait ModelTransport: Send + Sync {
    async fn attempt(
        &self,
        model: &str,
        credential: &str,
        request: &GenerationRequest,
    ) -> Result<String, GenerationError>;
}

/// Build the production client from configuration and the environment.
pub fn client_from_config(
    config: &GeminiConfig,
) -> Result<RotatingClient<GeminiTransport>, NewsroomError> {
    let credentials = resolve_api_keys(config)?;
    let transport = GeminiTransport::new(
        &config.base_url,
        std::time::Duration::from_secs(config.timeout_secs),
    )?;
    let policy = FallbackPolicy::from_config(config);
    Ok(RotatingClient::new(transport, policy, credentials)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builders() {
        let req = GenerationRequest::text("hi");
        assert_eq!(req.tier, ModelTier::Light);
        assert!(!req.expects_json());

        let req = GenerationRequest::json("hi", serde_json::json!({"type": "OBJECT"}));
        assert!(req.expects_json());
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);

        let req = GenerationRequest::text("draft").with_search().with_max_output_tokens(1024);
        assert!(req.search);
        assert_eq!(req.tier, ModelTier::Heavy);
        assert_eq!(req.max_output_tokens, 1024);
    }
}
