//! Mock ticket client for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use jira::{NewTicket, Ticket, TicketUpdate};

use super::{Result, TicketClient, TicketError};

/// Mock ticket client backed by an in-memory ticket list.
///
/// Create/update calls are counted so tests can assert that (for example)
/// duplicate suppression never reached the mutation client.
#[derive(Clone, Default)]
pub struct MockTicketClient {
    tickets: Arc<RwLock<Vec<Ticket>>>,
    fetch_calls: Arc<AtomicUsize>,
    create_calls: Arc<AtomicUsize>,
    update_calls: Arc<AtomicUsize>,
    fail_fetch: Arc<RwLock<bool>>,
    fail_mutations: Arc<RwLock<bool>>,
}

impl MockTicketClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the remote ticket set.
    pub fn with_tickets(self, tickets: Vec<Ticket>) -> Self {
        *self.tickets.write().unwrap() = tickets;
        self
    }

    /// Make `fetch_all` fail with a fetch error.
    pub fn with_failing_fetch(self) -> Self {
        *self.fail_fetch.write().unwrap() = true;
        self
    }

    /// Make `create`/`update` fail with a mutation error.
    pub fn with_failing_mutations(self) -> Self {
        *self.fail_mutations.write().unwrap() = true;
        self
    }

    /// Flip fetch failure at runtime (shared across clones).
    pub fn set_fail_fetch(&self, fail: bool) {
        *self.fail_fetch.write().unwrap() = fail;
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn tickets(&self) -> Vec<Ticket> {
        self.tickets.read().unwrap().clone()
    }
}

#[async_trait]
impl TicketClient for MockTicketClient {
    async fn fetch_all(&self) -> Result<Vec<Ticket>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_fetch.read().unwrap() {
            return Err(TicketError::Fetch("mock fetch failure".into()));
        }
        Ok(self.tickets.read().unwrap().clone())
    }

    async fn create(&self, fields: &NewTicket) -> Result<Ticket> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_mutations.read().unwrap() {
            return Err(TicketError::Mutation("mock create failure".into()));
        }

        let mut tickets = self.tickets.write().unwrap();
        let ticket = Ticket {
            key: format!("MOCK-{}", tickets.len() + 1),
            summary: fields.summary.clone(),
            description: fields.description.clone(),
            status: "To Do".to_string(),
            priority: fields
                .priority
                .clone()
                .unwrap_or_else(|| "Medium".to_string()),
        };
        tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn update(&self, key: &str, update: &TicketUpdate) -> Result<Ticket> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_mutations.read().unwrap() {
            return Err(TicketError::Mutation("mock update failure".into()));
        }

        let mut tickets = self.tickets.write().unwrap();
        let ticket = tickets
            .iter_mut()
            .find(|t| t.key == key)
            .ok_or_else(|| TicketError::NotFound(key.to_string()))?;

        if let Some(summary) = &update.summary {
            ticket.summary = summary.clone();
        }
        if let Some(description) = &update.description {
            ticket.description = description.clone();
        }
        if let Some(priority) = &update.priority {
            ticket.priority = priority.clone();
        }
        if let Some(status) = &update.status {
            ticket.status = status.clone();
        }

        Ok(ticket.clone())
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

    #[tokio::test]
    async fn create_appends_and_counts() {
        let client = MockTicketClient::new();
        let fields = NewTicket {
            summary: "New bug".to_string(),
            description: "Details".to_string(),
            ..Default::default()
        };

        let ticket = client.create(&fields).await.unwrap();
        assert_eq!(ticket.key, "MOCK-1");
        assert_eq!(client.create_calls(), 1);
        assert_eq!(client.tickets().len(), 1);
    }

    #[tokio::test]
    async fn update_unknown_key_is_not_found() {
        let client = MockTicketClient::new().with_tickets(vec![make_ticket("MOCK-1")]);

        let err = client
            .update("MOCK-9", &TicketUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TicketError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_applies_status() {
        let client = MockTicketClient::new().with_tickets(vec![make_ticket("MOCK-1")]);

        let updated = client
            .update(
                "MOCK-1",
                &TicketUpdate {
                    status: Some("Done".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, "Done");
    }
}
