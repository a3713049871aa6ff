use serde::{Deserialize, Serialize};

/// A work item snapshot fetched from Jira.
///
/// Immutable on this side of the API; the remote system owns the data and
/// every value here was captured at fetch time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub key: String,
    pub summary: String,
    pub description: String,
    pub status: String,
    pub priority: String,
}

/// Fields for creating a new ticket.
#[derive(Clone, Debug, Default)]
pub struct NewTicket {
    pub summary: String,
    pub description: String,
    pub issue_type: Option<String>,
    pub priority: Option<String>,
}

/// Fields to change on an existing ticket. `None` fields are left untouched.
///
/// A status change goes through the transitions endpoint rather than a field
/// update, so it is carried separately from the plain fields.
#[derive(Clone, Debug, Default)]
pub struct TicketUpdate {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
}

impl TicketUpdate {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.status.is_none()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchResponse {
    pub issues: Vec<RawIssue>,
    pub start_at: usize,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawIssue {
    pub key: String,
    pub fields: RawFields,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawFields {
    #[serde(default)]
    pub summary: String,
    pub description: Option<String>,
    pub status: Option<NamedField>,
    pub priority: Option<NamedField>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NamedField {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedIssue {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransitionsResponse {
    pub transitions: Vec<Transition>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Transition {
    pub id: String,
    pub name: String,
}

impl From<RawIssue> for Ticket {
    fn from(issue: RawIssue) -> Self {
        Self {
            key: issue.key,
            summary: issue.fields.summary,
            description: issue.fields.description.unwrap_or_default(),
            status: issue
                .fields
                .status
                .map(|s| s.name)
                .unwrap_or_default(),
            priority: issue
                .fields
                .priority
                .map(|p| p.name)
                .unwrap_or_else(|| "None".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_issue_converts_to_ticket() {
        let raw: RawIssue = serde_json::from_value(serde_json::json!({
            "key": "SCRUM-4",
            "fields": {
                "summary": "Payment API timeout",
                "description": "Requests to the payment gateway time out after 30s",
                "status": { "name": "To Do" },
                "priority": { "name": "High" }
            }
        }))
        .unwrap();

        let ticket = Ticket::from(raw);
        assert_eq!(ticket.key, "SCRUM-4");
        assert_eq!(ticket.summary, "Payment API timeout");
        assert_eq!(ticket.status, "To Do");
        assert_eq!(ticket.priority, "High");
    }

    #[test]
    fn missing_optional_fields_get_defaults() {
        let raw: RawIssue = serde_json::from_value(serde_json::json!({
            "key": "SCRUM-7",
            "fields": {
                "summary": "Bare ticket",
                "description": null,
                "status": null,
                "priority": null
            }
        }))
        .unwrap();

        let ticket = Ticket::from(raw);
        assert_eq!(ticket.description, "");
        assert_eq!(ticket.status, "");
        assert_eq!(ticket.priority, "None");
    }

    #[test]
    fn search_response_deserializes() {
        let resp: SearchResponse = serde_json::from_value(serde_json::json!({
            "startAt": 0,
            "maxResults": 50,
            "total": 1,
            "issues": [{
                "key": "SCRUM-1",
                "fields": { "summary": "One", "description": "D" }
            }]
        }))
        .unwrap();

        assert_eq!(resp.total, 1);
        assert_eq!(resp.issues.len(), 1);
        assert_eq!(resp.start_at, 0);
    }
}
