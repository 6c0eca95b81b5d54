//! Model fallback and credential rotation.
//!
//! For each model in the request's tier, keys are tried starting from the
//! shared current index. A rate limit marks the `(model, key)` pair as
//! exhausted for the life of the client and moves on to the next key; any
//! other failure abandons the model and falls back to the next one.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use newsroom_shared::GeminiConfig;

use crate::json::extract_json;
use crate::{GenerationError, GenerationRequest, GenerationService, Generated, ModelTier, ModelTransport};

/// Ordered model lists and the pause between attempts.
#[derive(Debug, Clone)]
pub struct FallbackPolicy {
    pub light_models: Vec<String>,
    pub heavy_models: Vec<String>,
    /// Fixed delay before every attempt after the first in one call.
    pub retry_delay: Duration,
}

impl FallbackPolicy {
    pub fn from_config(config: &GeminiConfig) -> Self {
        Self {
            light_models: config.light_models.clone(),
            heavy_models: config.heavy_models.clone(),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    fn models(&self, tier: ModelTier) -> &[String] {
        match tier {
            ModelTier::Light => &self.light_models,
            ModelTier::Heavy => &self.heavy_models,
        }
    }
}

#[derive(Default)]
struct RotationState {
    current: usize,
    exhausted: HashSet<(String, usize)>,
}

/// [`GenerationService`] over any [`ModelTransport`].
pub struct RotatingClient<T> {
    transport: T,
    policy: FallbackPolicy,
    credentials: Vec<String>,
    state: Mutex<RotationState>,
}

impl<T: ModelTransport> RotatingClient<T> {
    pub fn new(
        transport: T,
        policy: FallbackPolicy,
        credentials: Vec<String>,
    ) -> Result<Self, GenerationError> {
        if credentials.is_empty() {
            return Err(GenerationError::NoCredentials);
        }
        Ok(Self {
            transport,
            policy,
            credentials,
            state: Mutex::new(RotationState::default()),
        })
    }

    /// Next non-exhausted key index for `model`, starting at the shared cursor.
    fn next_key(&self, model: &str, skipped: &mut usize) -> Option<usize> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        while *skipped < self.credentials.len() {
            let idx = state.current;
            if !state.exhausted.contains(&(model.to_string(), idx)) {
                return Some(idx);
            }
            state.current = (idx + 1) % self.credentials.len();
            *skipped += 1;
        }
        None
    }

    fn mark_exhausted(&self, model: &str, idx: usize) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.exhausted.insert((model.to_string(), idx));
        state.current = (idx + 1) % self.credentials.len();
    }

    async fn try_model(
        &self,
        model: &str,
        request: &GenerationRequest,
        attempts: &mut usize,
    ) -> Result<Generated, GenerationError> {
        let mut tried = 0;
        while let Some(idx) = self.next_key(model, &mut tried) {
            if *attempts > 0 && !self.policy.retry_delay.is_zero() {
                tokio::time::sleep(self.policy.retry_delay).await;
            }
            *attempts += 1;

            match self
                .transport
                .attempt(model, &self.credentials[idx], request)
                .await
            {
                Ok(text) => return finish(model, text, request),
                Err(GenerationError::RateLimited) => {
                    warn!(model, key = idx + 1, "rate limited, rotating key");
                    self.mark_exhausted(model, idx);
                    tried += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Err(GenerationError::RateLimited)
    }
}

fn finish(model: &str, text: String, request: &GenerationRequest) -> Result<Generated, GenerationError> {
    if text.trim().is_empty() {
        return Err(GenerationError::Empty);
    }
    let json = if request.expects_json() {
        Some(extract_json(&text).ok_or_else(|| GenerationError::Malformed {
            model: model.to_string(),
        })?)
    } else {
        None
    };
    Ok(Generated {
        model: model.to_string(),
        text,
        json,
    })
}

#[async_trait]
impl<T: ModelTransport> GenerationService for RotatingClient<T> {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generated, GenerationError> {
        let mut attempts = 0;
        for model in self.policy.models(request.tier) {
            match self.try_model(model, request, &mut attempts).await {
                Ok(generated) => {
                    info!(model = %generated.model, attempts, "generation succeeded");
                    return Ok(generated);
                }
                Err(e) => warn!(model = %model, error = %e, "model failed, falling back"),
            }
        }
        Err(GenerationError::Exhausted { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    type Script = dyn Fn(&str, &str) -> Result<String, GenerationError> + Send + Sync;

    /// Transport driven by a closure over `(model, credential)`, recording calls.
    struct Scripted {
        respond: Box<Script>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl Scripted {
        fn new(
            respond: impl Fn(&str, &str) -> Result<String, GenerationError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                respond: Box::new(respond),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ModelTransport for Scripted {
        async fn attempt(
            &self,
            model: &str,
            credential: &str,
            _request: &GenerationRequest,
        ) -> Result<String, GenerationError> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), credential.to_string()));
            (self.respond)(model, credential)
        }
    }

    fn policy() -> FallbackPolicy {
        FallbackPolicy {
            light_models: vec!["light-a".into(), "light-b".into()],
            heavy_models: vec!["heavy-a".into()],
            retry_delay: Duration::ZERO,
        }
    }

    fn client(transport: Scripted) -> RotatingClient<Scripted> {
        RotatingClient::new(transport, policy(), vec!["k1".into(), "k2".into()]).unwrap()
    }

    fn calls(c: &RotatingClient<Scripted>) -> Vec<(String, String)> {
        c.transport.calls.lock().unwrap().clone()
    }

    fn pair(model: &str, key: &str) -> (String, String) {
        (model.to_string(), key.to_string())
    }

    #[tokio::test]
    async fn first_model_first_key() {
        let c = client(Scripted::new(|_, _| Ok("本文".into())));
        let out = c.generate(&GenerationRequest::text("p")).await.unwrap();
        assert_eq!(out.model, "light-a");
        assert_eq!(out.text, "本文");
        assert_eq!(out.json, None);
        assert_eq!(calls(&c), vec![pair("light-a", "k1")]);
    }

    #[tokio::test]
    async fn rate_limit_rotates_key_on_same_model() {
        let c = client(Scripted::new(|_, key| match key {
            "k1" => Err(GenerationError::RateLimited),
            _ => Ok("ok".into()),
        }));
        let out = c.generate(&GenerationRequest::text("p")).await.unwrap();
        assert_eq!(out.model, "light-a");
        assert_eq!(calls(&c), vec![pair("light-a", "k1"), pair("light-a", "k2")]);
    }

    #[tokio::test]
    async fn exhausted_pair_is_skipped_on_later_calls() {
        let c = client(Scripted::new(|model, key| match (model, key) {
            ("light-a", "k1") => Err(GenerationError::RateLimited),
            _ => Ok("ok".into()),
        }));
        c.generate(&GenerationRequest::text("p")).await.unwrap();
        c.generate(&GenerationRequest::text("p")).await.unwrap();

        let log = calls(&c);
        assert_eq!(
            log,
            vec![pair("light-a", "k1"), pair("light-a", "k2"), pair("light-a", "k2")]
        );
    }

    #[tokio::test]
    async fn all_keys_limited_falls_back_to_next_model() {
        let c = client(Scripted::new(|model, _| match model {
            "light-a" => Err(GenerationError::RateLimited),
            _ => Ok("fallback".into()),
        }));
        let out = c.generate(&GenerationRequest::text("p")).await.unwrap();
        assert_eq!(out.model, "light-b");
        assert_eq!(calls(&c).len(), 3);
    }

    #[tokio::test]
    async fn timeout_abandons_model_without_rotating_keys() {
        let c = client(Scripted::new(|model, _| match model {
            "light-a" => Err(GenerationError::Timeout),
            _ => Ok("ok".into()),
        }));
        let out = c.generate(&GenerationRequest::text("p")).await.unwrap();
        assert_eq!(out.model, "light-b");
        assert_eq!(calls(&c), vec![pair("light-a", "k1"), pair("light-b", "k1")]);
    }

    #[tokio::test]
    async fn malformed_json_falls_back_to_next_model() {
        let c = client(Scripted::new(|model, _| match model {
            "light-a" => Ok("Sure! Here is the JSON you asked for.".into()),
            _ => Ok("```json\n{\"best_index\": 1}\n```".into()),
        }));
        let req = GenerationRequest::json("p", json!({"type": "OBJECT"}));
        let out = c.generate(&req).await.unwrap();
        assert_eq!(out.model, "light-b");
        assert_eq!(out.json, Some(json!({"best_index": 1})));
    }

    #[tokio::test]
    async fn search_requests_use_heavy_models() {
        let c = client(Scripted::new(|_, _| Ok("draft".into())));
        let out = c
            .generate(&GenerationRequest::text("p").with_search())
            .await
            .unwrap();
        assert_eq!(out.model, "heavy-a");
    }

    #[tokio::test]
    async fn every_failure_is_exhausted() {
        let c = client(Scripted::new(|_, _| Err(GenerationError::Empty)));
        let err = c.generate(&GenerationRequest::text("p")).await.unwrap_err();
        assert!(matches!(err, GenerationError::Exhausted { attempts: 2 }), "{err:?}");
    }

    #[test]
    fn no_credentials_is_rejected() {
        let err = RotatingClient::new(Scripted::new(|_, _| Ok(String::new())), policy(), vec![])
            .err()
            .unwrap();
        assert!(matches!(err, GenerationError::NoCredentials));
    }
}
