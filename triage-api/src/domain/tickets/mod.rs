//! Ticket client abstraction over the remote tracking system.
//!
//! The orchestrator and the sync pipeline both talk to the tracker through
//! [`TicketClient`], so tests can swap in [`MockTicketClient`] without any
//! network access.

mod jira_source;
mod mock;

use async_trait::async_trait;
use jira::{NewTicket, Ticket, TicketUpdate};

pub use jira_source::JiraTicketClient;
pub use mock::MockTicketClient;

/// Error type for ticket operations. The remote client has already spent
/// its own retry budget by the time one of these surfaces.
#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("Failed to fetch tickets: {0}")]
    Fetch(String),

    #[error("Ticket mutation failed: {0}")]
    Mutation(String),

    #[error("Ticket not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, TicketError>;

/// CRUD operations against the remote ticket system.
#[async_trait]
pub trait TicketClient: Send + Sync {
    /// Fetch the full ticket set for the configured project.
    async fn fetch_all(&self) -> Result<Vec<Ticket>>;

    /// Create a ticket and return its fresh state.
    async fn create(&self, fields: &NewTicket) -> Result<Ticket>;

    /// Apply changes to an existing ticket and return its fresh state.
    async fn update(&self, key: &str, update: &TicketUpdate) -> Result<Ticket>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_client_object_safe(_: &dyn TicketClient) {}

    #[test]
    fn errors_render_with_context() {
        assert_eq!(
            TicketError::NotFound("SCRUM-3".into()).to_string(),
            "Ticket not found: SCRUM-3"
        );
    }
}
