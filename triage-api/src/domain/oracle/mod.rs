//! External validation and intent-classification oracles.
//!
//! Both capabilities live out of process behind an LLM API; the core only
//! sees the trait boundary, so routing is testable with scripted mocks.

mod chat;
mod mock;
mod openai;

use async_trait::async_trait;

use crate::domain::routing::RoutingDecision;
use crate::domain::session::TurnContext;

pub use mock::{MockClassifier, MockGuardrail};
pub use openai::{OpenAiClassifier, OpenAiGuardrail};

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("Guardrail call failed: {0}")]
    Guardrail(String),

    #[error("Classifier call failed: {0}")]
    Classifier(String),
}

pub type Result<T> = std::result::Result<T, OracleError>;

/// Verdict from the guardrail oracle.
#[derive(Debug, Clone)]
pub struct Validation {
    pub valid: bool,
    pub reason: Option<String>,
}

impl Validation {
    pub fn valid() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Validates a request before any routing happens. A non-valid verdict is a
/// terminal rejection.
#[async_trait]
pub trait Guardrail: Send + Sync {
    async fn validate(&self, text: &str) -> Result<Validation>;
}

/// Classifies a request's intent. Consulted only when the keyword rules are
/// inconclusive.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(
        &self,
        text: &str,
        context: Option<&TurnContext>,
    ) -> Result<RoutingDecision>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_guardrail_object_safe(_: &dyn Guardrail) {}
    fn _assert_classifier_object_safe(_: &dyn IntentClassifier) {}
}
