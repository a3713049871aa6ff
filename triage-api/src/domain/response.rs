//! The outward response contract of the orchestrator.

use jira::Ticket;
use serde::Serialize;

use super::similarity::SimilarityResult;

/// What kind of outcome the envelope carries. `Similar` doubles as the
/// zero-value default for rejections and mutation failures — an accepted
/// convention of the wire contract, not a semantic claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseType {
    #[default]
    Similar,
    Created,
    Updated,
}

/// A ticket as presented to the caller, optionally scored.
#[derive(Debug, Clone, Serialize)]
pub struct TicketInfo {
    pub key: String,
    pub summary: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f64>,
}

impl From<Ticket> for TicketInfo {
    fn from(ticket: Ticket) -> Self {
        Self {
            key: ticket.key,
            summary: ticket.summary,
            description: ticket.description,
            status: ticket.status,
            priority: ticket.priority,
            similarity_score: None,
        }
    }
}

impl From<&SimilarityResult> for TicketInfo {
    fn from(result: &SimilarityResult) -> Self {
        Self {
            similarity_score: Some(result.score),
            ..Self::from(result.ticket.clone())
        }
    }
}

/// One response per turn. Exactly one `type` is set; a populated `error`
/// does not change it.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseEnvelope {
    pub session_id: String,
    pub message: String,
    pub tickets: Vec<TicketInfo>,
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub error: Option<String>,
}

impl ResponseEnvelope {
    pub fn similar(
        session_id: impl Into<String>,
        message: impl Into<String>,
        tickets: Vec<TicketInfo>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
            tickets,
            response_type: ResponseType::Similar,
            error: None,
        }
    }

    pub fn created(
        session_id: impl Into<String>,
        message: impl Into<String>,
        ticket: Ticket,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
            tickets: vec![TicketInfo::from(ticket)],
            response_type: ResponseType::Created,
            error: None,
        }
    }

    pub fn updated(
        session_id: impl Into<String>,
        message: impl Into<String>,
        ticket: Ticket,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
            tickets: vec![TicketInfo::from(ticket)],
            response_type: ResponseType::Updated,
            error: None,
        }
    }

    /// Terminal guardrail rejection.
    pub fn rejected(session_id: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            session_id: session_id.into(),
            message: format!("I cannot process this request. {}", reason),
            tickets: vec![],
            response_type: ResponseType::default(),
            error: Some(reason),
        }
    }

    /// Dependency failure surfaced to the caller.
    pub fn failure(session_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: String::new(),
            tickets: vec![],
            response_type: ResponseType::default(),
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_ticket(key: &str) -> Ticket {
        Ticket {
            key: key.to_string(),
            summary: "Summary".to_string(),
            description: "Description".to_string(),
            status: "To Do".to_string(),
            priority: "Medium".to_string(),
        }
    }

    #[test]
    fn type_serializes_screaming() {
        let envelope = ResponseEnvelope::similar("s1", "msg", vec![]);
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["type"], "SIMILAR");
        assert_eq!(value["error"], serde_json::Value::Null);

        let envelope = ResponseEnvelope::created("s1", "msg", make_ticket("SCRUM-1"));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["type"], "CREATED");
    }

    #[test]
    fn score_is_omitted_when_absent() {
        let envelope = ResponseEnvelope::created("s1", "msg", make_ticket("SCRUM-1"));
        let value = serde_json::to_value(&envelope).unwrap();
        assert!(value["tickets"][0].get("similarity_score").is_none());

        let result = SimilarityResult {
            ticket: make_ticket("SCRUM-1"),
            score: 0.75,
        };
        let envelope = ResponseEnvelope::similar("s1", "msg", vec![TicketInfo::from(&result)]);
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["tickets"][0]["similarity_score"], 0.75);
    }

    #[test]
    fn rejection_keeps_default_type_and_sets_error() {
        let envelope = ResponseEnvelope::rejected("s1", "Deletion is not supported");
        assert_eq!(envelope.response_type, ResponseType::Similar);
        assert!(envelope.tickets.is_empty());
        assert_eq!(envelope.error.as_deref(), Some("Deletion is not supported"));
        assert!(envelope.message.contains("Deletion is not supported"));
    }
}
