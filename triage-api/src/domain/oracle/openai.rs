//! Chat-backed guardrail and intent classifier.

use std::str::FromStr;

use async_trait::async_trait;
use tracing::warn;

use super::chat::ChatClient;
use super::{Guardrail, IntentClassifier, OracleError, Result, Validation};
use crate::config::OpenAiSettings;
use crate::domain::routing::RoutingDecision;
use crate::domain::session::TurnContext;

const GUARDRAIL_SYSTEM: &str = "You validate requests for a ticket-tracking assistant. \
Valid requests search for, create, or update tickets, or ask how to use the assistant; \
short follow-ups like 'create a new ticket' are valid. \
Invalid requests are harmful, off-topic, nonsensical, or ask to delete tickets. \
Respond with exactly 'VALID' or 'INVALID: <reason>'.";

const CLASSIFIER_SYSTEM: &str = "You classify a request to a ticket-tracking assistant \
into exactly one intent: search, create, update, or info. \
Respond with only the intent word.";

/// Guardrail speaking the `VALID` / `INVALID: reason` protocol.
#[derive(Clone)]
pub struct OpenAiGuardrail {
    chat: ChatClient,
    model: String,
}

impl OpenAiGuardrail {
    pub fn new(settings: &OpenAiSettings) -> Result<Self> {
        let chat = ChatClient::new(settings).map_err(OracleError::Guardrail)?;
        Ok(Self {
            chat,
            model: settings.guardrail_model.clone(),
        })
    }
}

#[async_trait]
impl Guardrail for OpenAiGuardrail {
    async fn validate(&self, text: &str) -> Result<Validation> {
        let answer = self
            .chat
            .complete(&self.model, GUARDRAIL_SYSTEM, text)
            .await
            .map_err(OracleError::Guardrail)?;

        if answer.to_uppercase().starts_with("VALID") {
            return Ok(Validation::valid());
        }

        let reason = answer
            .split_once(':')
            .map(|(_, r)| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "Request does not meet guidelines".to_string());

        Ok(Validation::rejected(reason))
    }
}

/// Classifier returning one intent word.
#[derive(Clone)]
pub struct OpenAiClassifier {
    chat: ChatClient,
    model: String,
}

impl OpenAiClassifier {
    pub fn new(settings: &OpenAiSettings) -> Result<Self> {
        let chat = ChatClient::new(settings).map_err(OracleError::Classifier)?;
        Ok(Self {
            chat,
            model: settings.chat_model.clone(),
        })
    }
}

#[async_trait]
impl IntentClassifier for OpenAiClassifier {
    async fn classify(
        &self,
        text: &str,
        context: Option<&TurnContext>,
    ) -> Result<RoutingDecision> {
        let user = match context {
            Some(ctx) if ctx.surfaced_similar => format!(
                "{}\n\n(The previous turn showed the user similar existing tickets.)",
                text
            ),
            _ => text.to_string(),
        };

        let answer = self
            .chat
            .complete(&self.model, CLASSIFIER_SYSTEM, &user)
            .await
            .map_err(OracleError::Classifier)?;

        RoutingDecision::from_str(answer.to_lowercase().trim()).or_else(|_| {
            warn!(intent = %answer, "Classifier returned an unknown intent, defaulting to search");
            Ok(RoutingDecision::Search)
        })
    }
}
