//! Deterministic routing rules evaluated before the classifier oracle.
//!
//! Keyword scans decide most turns without a model call; the classifier is
//! consulted only when neither keyword set matches.

use std::sync::LazyLock;

use jira::{NewTicket, TicketUpdate};
use regex::Regex;
use strum::{Display, EnumString};

/// Where a request should be routed, combined from keyword rules, the
/// classifier oracle, and session context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RoutingDecision {
    Search,
    Create,
    Update,
    Info,
}

// Keyword rules compiled once
static MUTATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(create|add|new ticket|update|modify|change|edit|set status|mark as)\b")
        .unwrap()
});
static LOOKUP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(check|verify|search|find|look up|exists|similar|duplicate|match)\b")
        .unwrap()
});
static TICKET_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][A-Z0-9]+-\d+\b").unwrap());
static STATUS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:set status(?: to)?|status to|mark as)\s+([A-Za-z][A-Za-z ]{0,30})")
        .unwrap()
});
static PRIORITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:set )?priority(?: to)?\s+(highest|high|medium|low|lowest)\b").unwrap()
});

/// Apply the keyword rules to a request. `None` means the rules were
/// inconclusive and the classifier oracle decides.
///
/// A mutation keyword with a ticket key in the text means an update; a
/// mutation keyword without one means a create.
pub fn detect_keyword_decision(text: &str) -> Option<RoutingDecision> {
    if MUTATION_PATTERN.is_match(text) {
        if ticket_key(text).is_some() {
            Some(RoutingDecision::Update)
        } else {
            Some(RoutingDecision::Create)
        }
    } else if LOOKUP_PATTERN.is_match(text) {
        Some(RoutingDecision::Search)
    } else {
        None
    }
}

/// First ticket identifier in the text, e.g. `SCRUM-123`. Additional keys
/// are ignored; the first one is the target.
pub fn ticket_key(text: &str) -> Option<&str> {
    TICKET_KEY_PATTERN.find(text).map(|m| m.as_str())
}

/// Fields for a create extracted from free text: the first line (clipped)
/// becomes the summary, the whole request becomes the description.
pub fn extract_create_fields(text: &str) -> NewTicket {
    let first_line = text.lines().next().unwrap_or(text).trim();
    let summary: String = first_line.chars().take(120).collect();

    NewTicket {
        summary,
        description: text.trim().to_string(),
        ..Default::default()
    }
}

/// Changed fields for an update extracted from free text. Status and
/// priority are pattern-matched; when neither is present the text itself
/// becomes the new description.
pub fn extract_update_fields(text: &str) -> TicketUpdate {
    let status = STATUS_PATTERN
        .captures(text)
        .map(|cap| cap[1].trim().to_string());
    let priority = PRIORITY_PATTERN
        .captures(text)
        .map(|cap| capitalize(&cap[1]));

    if status.is_none() && priority.is_none() {
        return TicketUpdate {
            description: Some(text.trim().to_string()),
            ..Default::default()
        };
    }

    TicketUpdate {
        status,
        priority,
        ..Default::default()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
