//! Failure modes of a generation call.

use newsroom_shared::NewsroomError;

/// Why a generation attempt (or a whole rotation) produced nothing usable.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// HTTP 429. Rotates to the next credential for the same model.
    #[error("rate limited")]
    RateLimited,

    /// The request exceeded its fixed timeout. Falls back to the next model.
    #[error("request timed out")]
    Timeout,

    /// Connection or protocol failure. Falls back to the next model.
    #[error("transport error: {0}")]
    Transport(String),

    /// Any other non-success status. Falls back to the next model.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Structured output that does not parse. Falls back to the next model.
    #[error("malformed structured output from {model}")]
    Malformed { model: String },

    /// A success status with no text in it.
    #[error("empty response")]
    Empty,

    /// Every model and credential was tried.
    #[error("all models failed after {attempts} attempt(s)")]
    Exhausted { attempts: usize },

    #[error("no API credentials configured")]
    NoCredentials,
}

impl From<GenerationError> for NewsroomError {
    fn from(err: GenerationError) -> Self {
        NewsroomError::Generation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_into_shared_error() {
        let err: NewsroomError = GenerationError::Exhausted { attempts: 4 }.into();
        assert_eq!(err.to_string(), "generation error: all models failed after 4 attempt(s)");
    }
}
