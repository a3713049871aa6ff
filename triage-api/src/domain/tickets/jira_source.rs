//! Jira-backed implementation of the ticket client.

use std::sync::Arc;

use async_trait::async_trait;
use jira::{JiraClient, JiraError, NewTicket, Ticket, TicketUpdate};

use super::{Result, TicketClient, TicketError};

/// Adapter from the `jira` crate's client to the domain trait.
#[derive(Clone)]
pub struct JiraTicketClient {
    client: Arc<JiraClient>,
}

impl JiraTicketClient {
    pub fn new(client: JiraClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

#[async_trait]
impl TicketClient for JiraTicketClient {
    async fn fetch_all(&self) -> Result<Vec<Ticket>> {
        self.client
            .fetch_all_tickets()
            .await
            .map_err(|e| TicketError::Fetch(e.to_string()))
    }

    async fn create(&self, fields: &NewTicket) -> Result<Ticket> {
        self.client
            .create_ticket(fields)
            .await
            .map_err(mutation_error)
    }

    async fn update(&self, key: &str, update: &TicketUpdate) -> Result<Ticket> {
        self.client
            .update_ticket(key, update)
            .await
            .map_err(mutation_error)
    }
}

fn mutation_error(err: JiraError) -> TicketError {
    match err {
        JiraError::NotFound(key) => TicketError::NotFound(key),
        other => TicketError::Mutation(other.to_string()),
    }
}
