//! Request orchestration: guardrail gate, routing rules, and the
//! similarity/mutation/info phases.
//!
//! The routing rules are evaluated deterministically and in order; the
//! classifier oracle is only consulted when no rule matches. Every turn
//! except a guardrail rejection is recorded into the session store before
//! the envelope is returned, so the next turn on the same session can see
//! what happened.

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::oracle::{Guardrail, IntentClassifier};
use super::response::{ResponseEnvelope, TicketInfo};
use super::routing::{self, RoutingDecision};
use super::session::{Session, SessionStore, TurnContext};
use super::similarity::{
    Embedder, SimilarityEngine, SimilarityError, SimilarityResult, SyncRequest,
};
use super::tickets::TicketClient;

const NO_HISTORY_MESSAGE: &str = "No historical ticket data is available yet. \
The system needs to sync tickets first. \
Would you like me to create a new ticket for this issue?";

const NONE_FOUND_MESSAGE: &str = "I didn't find any similar tickets. \
Would you like me to create a new ticket for this issue? \
Just say 'create ticket' or 'create new ticket'.";

const HELP_MESSAGE: &str = "I can help you:\n\
- Check if similar tickets exist (say 'check if there are tickets about X')\n\
- Create new tickets (say 'create a ticket for...')\n\
- Update existing tickets (say 'update SCRUM-123 set status to Done')\n\n\
What would you like to do?";

/// The request-handling core.
///
/// # Type Parameters
///
/// * `E` - Embedder behind the similarity engine
/// * `C` - Ticket client for mutations
/// * `G` - Guardrail oracle
/// * `I` - Intent classifier oracle
pub struct Orchestrator<E, C, G, I>
where
    E: Embedder,
    C: TicketClient,
    G: Guardrail,
    I: IntentClassifier,
{
    engine: SimilarityEngine<E>,
    tickets: C,
    guardrail: G,
    classifier: I,
    sessions: SessionStore,
    sync_requests: mpsc::Sender<SyncRequest>,
}

impl<E, C, G, I> Orchestrator<E, C, G, I>
where
    E: Embedder,
    C: TicketClient,
    G: Guardrail,
    I: IntentClassifier,
{
    pub fn new(
        engine: SimilarityEngine<E>,
        tickets: C,
        guardrail: G,
        classifier: I,
        sessions: SessionStore,
        sync_requests: mpsc::Sender<SyncRequest>,
    ) -> Self {
        Self {
            engine,
            tickets,
            guardrail,
            classifier,
            sessions,
            sync_requests,
        }
    }

    /// Handle one turn. Collaborator failures never escape; they surface as
    /// a populated `error` field on a normally-shaped envelope.
    #[tracing::instrument(name = "Orchestrator::handle", skip(self, question))]
    pub async fn handle(&self, session_id: &str, question: &str) -> ResponseEnvelope {
        let session_handle = self.sessions.get_or_create(session_id);
        // Held for the whole turn: turns within one session serialize,
        // sessions never contend with each other.
        let mut session = session_handle.lock().await;

        match self.guardrail.validate(question).await {
            Ok(verdict) if !verdict.valid => {
                let reason = verdict
                    .reason
                    .unwrap_or_else(|| "Request does not meet guidelines".to_string());
                warn!(%reason, "Request rejected by guardrail");
                // A rejected request does not consume the turn.
                return ResponseEnvelope::rejected(session_id, reason);
            }
            Ok(_) => {}
            Err(e) => {
                // Guardrail outage degrades to allow, not to reject.
                warn!(error = %e, "Guardrail unavailable, allowing request");
            }
        }

        let decision = self.detect_decision(question, &session).await;
        debug!(?decision, turn = session.turn_count, "Request routed");

        if session.is_first_turn() {
            // A new conversation always checks history before any action,
            // whatever the detected intent; the intent rides along as the
            // sub-intent of the similarity phase.
            return self
                .similarity_phase(session_id, question, decision, &mut session)
                .await;
        }

        match decision {
            RoutingDecision::Search => {
                self.similarity_phase(session_id, question, decision, &mut session)
                    .await
            }
            RoutingDecision::Create => {
                self.mutation_create(session_id, question, &mut session).await
            }
            RoutingDecision::Update => {
                self.mutation_update(session_id, question, &mut session).await
            }
            RoutingDecision::Info => Self::info_phase(session_id, &mut session),
        }
    }

    /// Keyword rules first; the classifier only when they are inconclusive.
    async fn detect_decision(&self, question: &str, session: &Session) -> RoutingDecision {
        if let Some(decision) = routing::detect_keyword_decision(question) {
            return decision;
        }

        match self
            .classifier
            .classify(question, session.last_context.as_ref())
            .await
        {
            Ok(decision) => decision,
            Err(e) => {
                warn!(error = %e, "Classifier unavailable, defaulting to search");
                RoutingDecision::Search
            }
        }
    }

    async fn similarity_phase(
        &self,
        session_id: &str,
        question: &str,
        sub_intent: RoutingDecision,
        session: &mut Session,
    ) -> ResponseEnvelope {
        if !self.engine.has_historical_data() {
            debug!("No historical data in the index");
            if sub_intent == RoutingDecision::Create {
                // Nothing to deduplicate against; go ahead and create.
                return self.mutation_create(session_id, question, session).await;
            }
            session.record_turn(TurnContext {
                decision: sub_intent,
                surfaced_similar: false,
            });
            return ResponseEnvelope::similar(session_id, NO_HISTORY_MESSAGE, vec![]);
        }

        let results = match self.engine.search(question).await {
            Ok(results) => results,
            Err(e) => {
                if matches!(e, SimilarityError::DimensionMismatch { .. }) {
                    error!(error = %e, "Corrupted index, requesting full rebuild");
                    let _ = self.sync_requests.try_send(SyncRequest);
                } else {
                    error!(error = %e, "Similarity search failed");
                }
                session.record_turn(TurnContext {
                    decision: sub_intent,
                    surfaced_similar: false,
                });
                return ResponseEnvelope::failure(session_id, e.to_string());
            }
        };

        if sub_intent == RoutingDecision::Create {
            if self.engine.is_duplicate(&results) {
                // The duplicate-prevention contract: show the near-identical
                // tickets instead of creating another one.
                info!(
                    top_score = results.first().map(|r| r.score),
                    "Near-identical ticket exists, suppressing creation"
                );
                let message = duplicate_message(&results);
                session.record_turn(TurnContext {
                    decision: sub_intent,
                    surfaced_similar: true,
                });
                return ResponseEnvelope::similar(
                    session_id,
                    message,
                    results.iter().map(TicketInfo::from).collect(),
                );
            }
            return self.mutation_create(session_id, question, session).await;
        }

        let surfaced = !results.is_empty();
        let message = if surfaced {
            found_message(&results)
        } else {
            NONE_FOUND_MESSAGE.to_string()
        };
        session.record_turn(TurnContext {
            decision: sub_intent,
            surfaced_similar: surfaced,
        });
        ResponseEnvelope::similar(
            session_id,
            message,
            results.iter().map(TicketInfo::from).collect(),
        )
    }

    async fn mutation_create(
        &self,
        session_id: &str,
        question: &str,
        session: &mut Session,
    ) -> ResponseEnvelope {
        let fields = routing::extract_create_fields(question);

        let envelope = match self.tickets.create(&fields).await {
            Ok(ticket) => {
                info!(key = %ticket.key, "Created ticket");
                let message = format!("Created ticket {}: {}", ticket.key, ticket.summary);
                ResponseEnvelope::created(session_id, message, ticket)
            }
            Err(e) => {
                error!(error = %e, "Ticket creation failed");
                ResponseEnvelope::failure(session_id, e.to_string())
            }
        };

        session.record_turn(TurnContext {
            decision: RoutingDecision::Create,
            surfaced_similar: false,
        });
        envelope
    }

    async fn mutation_update(
        &self,
        session_id: &str,
        question: &str,
        session: &mut Session,
    ) -> ResponseEnvelope {
        let Some(key) = routing::ticket_key(question) else {
            // An update without a target key implies a create, same as the
            // keyword rule.
            debug!("Update intent without a ticket key, treating as create");
            return self.mutation_create(session_id, question, session).await;
        };

        let update = routing::extract_update_fields(question);
        let envelope = match self.tickets.update(key, &update).await {
            Ok(ticket) => {
                info!(key = %ticket.key, "Updated ticket");
                let message = format!("Updated ticket {}", ticket.key);
                ResponseEnvelope::updated(session_id, message, ticket)
            }
            Err(e) => {
                error!(error = %e, "Ticket update failed");
                ResponseEnvelope::failure(session_id, e.to_string())
            }
        };

        session.record_turn(TurnContext {
            decision: RoutingDecision::Update,
            surfaced_similar: false,
        });
        envelope
    }

    fn info_phase(session_id: &str, session: &mut Session) -> ResponseEnvelope {
        session.record_turn(TurnContext {
            decision: RoutingDecision::Info,
            surfaced_similar: false,
        });
        ResponseEnvelope::similar(session_id, HELP_MESSAGE, vec![])
    }
}

fn found_message(results: &[SimilarityResult]) -> String {
    let plural = if results.len() == 1 { "" } else { "s" };
    format!(
        "I found {} similar ticket{}. Say 'create new ticket' to add a new one, \
         or 'update <ticket-key>' to modify an existing one.",
        results.len(),
        plural
    )
}

fn duplicate_message(results: &[SimilarityResult]) -> String {
    match results.first() {
        Some(top) => format!(
            "A very similar ticket already exists: {} ({:.0}% match). \
             Review it before creating a new one.",
            top.ticket.key,
            top.score * 100.0
        ),
        None => NONE_FOUND_MESSAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::oracle::{MockClassifier, MockGuardrail};
    use crate::domain::response::ResponseType;
    use crate::domain::similarity::embedder::MockEmbedder;
    use crate::domain::similarity::{IndexSnapshot, SimilarityConfig, VectorIndex};
    use crate::domain::tickets::MockTicketClient;
    use jira::Ticket;

    fn make_ticket(key: &str, summary: &str) -> Ticket {
        Ticket {
            key: key.to_string(),
            summary: summary.to_string(),
            description: "Description".to_string(),
            status: "To Do".to_string(),
            priority: "Medium".to_string(),
        }
    }

    struct Fixture {
        orchestrator:
            Orchestrator<MockEmbedder, MockTicketClient, MockGuardrail, MockClassifier>,
        tickets: MockTicketClient,
        classifier: MockClassifier,
        sessions: SessionStore,
        sync_rx: mpsc::Receiver<SyncRequest>,
    }

    /// Build an orchestrator whose index holds `indexed` tickets and whose
    /// embedder answers every query with `query_embedding`.
    fn fixture(
        indexed: Vec<(Ticket, Vec<f32>)>,
        query_embedding: Vec<f32>,
        guardrail: MockGuardrail,
        classifier: MockClassifier,
        tickets: MockTicketClient,
    ) -> Fixture {
        let index = Arc::new(VectorIndex::new());
        if !indexed.is_empty() {
            index.publish(IndexSnapshot::build(indexed, 1).unwrap());
        }

        let engine = SimilarityEngine::new(
            MockEmbedder::returning(query_embedding),
            index,
            SimilarityConfig::default(),
        );
        let sessions = SessionStore::default();
        let (sync_tx, sync_rx) = mpsc::channel(4);

        let orchestrator = Orchestrator::new(
            engine,
            tickets.clone(),
            guardrail,
            classifier.clone(),
            sessions.clone(),
            sync_tx,
        );

        Fixture {
            orchestrator,
            tickets,
            classifier,
            sessions,
            sync_rx,
        }
    }

    /// Advance a session past its first turn.
    async fn consume_first_turn(fx: &Fixture, session_id: &str) {
        let handle = fx.sessions.get_or_create(session_id);
        handle.lock().await.record_turn(TurnContext {
            decision: RoutingDecision::Search,
            surfaced_similar: true,
        });
    }

    #[tokio::test]
    async fn first_turn_checks_history_even_for_create_wording() {
        // Query embedding identical to the indexed ticket: a duplicate.
        let fx = fixture(
            vec![(make_ticket("SCRUM-1", "Payment timeout"), vec![0.0, 1.0])],
            vec![0.0, 1.0],
            MockGuardrail::allowing(),
            MockClassifier::default(),
            MockTicketClient::new(),
        );

        let envelope = fx
            .orchestrator
            .handle("s1", "create a bug for payment timeout")
            .await;

        assert_eq!(envelope.response_type, ResponseType::Similar);
        assert_eq!(envelope.tickets.len(), 1);
        assert_eq!(envelope.tickets[0].key, "SCRUM-1");
        assert_eq!(envelope.tickets[0].similarity_score, Some(1.0));
        // The duplicate gate kept the mutation client out of it entirely.
        assert_eq!(fx.tickets.create_calls(), 0);
    }

    #[tokio::test]
    async fn first_turn_create_without_duplicates_creates() {
        // Indexed ticket far from the query: nothing clears the threshold.
        let fx = fixture(
            vec![(make_ticket("SCRUM-1", "Unrelated"), vec![10.0])],
            vec![0.0],
            MockGuardrail::allowing(),
            MockClassifier::default(),
            MockTicketClient::new(),
        );

        let envelope = fx
            .orchestrator
            .handle("s1", "create a ticket for the broken export button")
            .await;

        assert_eq!(envelope.response_type, ResponseType::Created);
        assert_eq!(envelope.tickets.len(), 1);
        assert!(envelope.tickets[0].similarity_score.is_none());
        assert_eq!(fx.tickets.create_calls(), 1);
    }

    #[tokio::test]
    async fn first_turn_plain_text_searches() {
        let fx = fixture(
            vec![(make_ticket("SCRUM-1", "Login broken"), vec![0.0])],
            vec![0.0],
            MockGuardrail::allowing(),
            MockClassifier::default(),
            MockTicketClient::new(),
        );

        let envelope = fx.orchestrator.handle("s1", "the login page is broken").await;

        assert_eq!(envelope.response_type, ResponseType::Similar);
        assert_eq!(envelope.tickets.len(), 1);
        assert!(envelope.error.is_none());

        // The turn was recorded.
        let handle = fx.sessions.get_or_create("s1");
        assert_eq!(handle.lock().await.turn_count, 1);
    }

    #[tokio::test]
    async fn second_turn_keyword_create_bypasses_classifier() {
        let fx = fixture(
            vec![(make_ticket("SCRUM-1", "Old"), vec![10.0])],
            vec![0.0],
            MockGuardrail::allowing(),
            MockClassifier::default(),
            MockTicketClient::new(),
        );
        consume_first_turn(&fx, "s1").await;

        let envelope = fx
            .orchestrator
            .handle("s1", "create a new ticket for this")
            .await;

        assert_eq!(envelope.response_type, ResponseType::Created);
        assert_eq!(fx.tickets.create_calls(), 1);
        assert_eq!(fx.classifier.calls(), 0);
    }

    #[tokio::test]
    async fn guardrail_rejection_is_terminal() {
        let fx = fixture(
            vec![(make_ticket("SCRUM-1", "T"), vec![0.0])],
            vec![0.0],
            MockGuardrail::rejecting("Deleting tickets is not supported"),
            MockClassifier::default(),
            MockTicketClient::new(),
        );

        let envelope = fx.orchestrator.handle("s1", "delete every ticket").await;

        assert_eq!(envelope.response_type, ResponseType::Similar);
        assert!(envelope.tickets.is_empty());
        assert!(envelope
            .message
            .contains("Deleting tickets is not supported"));
        assert_eq!(
            envelope.error.as_deref(),
            Some("Deleting tickets is not supported")
        );

        // No routing happened and the turn was not consumed.
        assert_eq!(fx.classifier.calls(), 0);
        assert_eq!(fx.tickets.create_calls(), 0);
        let handle = fx.sessions.get_or_create("s1");
        assert_eq!(handle.lock().await.turn_count, 0);
    }

    #[tokio::test]
    async fn guardrail_outage_allows_the_request() {
        let fx = fixture(
            vec![(make_ticket("SCRUM-1", "T"), vec![0.0])],
            vec![0.0],
            MockGuardrail::failing(),
            MockClassifier::default(),
            MockTicketClient::new(),
        );
        consume_first_turn(&fx, "s1").await;

        let envelope = fx
            .orchestrator
            .handle("s1", "check for tickets about exports")
            .await;

        assert_eq!(envelope.response_type, ResponseType::Similar);
        assert!(envelope.error.is_none());
    }

    #[tokio::test]
    async fn second_turn_update_with_key() {
        let fx = fixture(
            vec![(make_ticket("MOCK-1", "T"), vec![0.0])],
            vec![0.0],
            MockGuardrail::allowing(),
            MockClassifier::default(),
            MockTicketClient::new().with_tickets(vec![make_ticket("MOCK-1", "T")]),
        );
        consume_first_turn(&fx, "s1").await;

        let envelope = fx
            .orchestrator
            .handle("s1", "update MOCK-1 set status to Done")
            .await;

        assert_eq!(envelope.response_type, ResponseType::Updated);
        assert_eq!(envelope.tickets.len(), 1);
        assert_eq!(envelope.tickets[0].status, "Done");
        assert!(envelope.tickets[0].similarity_score.is_none());
        assert_eq!(fx.tickets.update_calls(), 1);
    }

    #[tokio::test]
    async fn mutation_failure_surfaces_in_error_field() {
        let fx = fixture(
            vec![(make_ticket("SCRUM-1", "Old"), vec![10.0])],
            vec![0.0],
            MockGuardrail::allowing(),
            MockClassifier::default(),
            MockTicketClient::new().with_failing_mutations(),
        );
        consume_first_turn(&fx, "s1").await;

        let envelope = fx
            .orchestrator
            .handle("s1", "create a ticket for the broken export")
            .await;

        assert_eq!(envelope.response_type, ResponseType::Similar);
        assert_eq!(envelope.message, "");
        assert!(envelope.tickets.is_empty());
        assert!(envelope.error.as_deref().unwrap().contains("create"));
    }

    #[tokio::test]
    async fn info_intent_returns_help() {
        let fx = fixture(
            vec![(make_ticket("SCRUM-1", "T"), vec![0.0])],
            vec![0.0],
            MockGuardrail::allowing(),
            MockClassifier::returning(RoutingDecision::Info),
            MockTicketClient::new(),
        );
        consume_first_turn(&fx, "s1").await;

        let envelope = fx.orchestrator.handle("s1", "how does this work?").await;

        assert_eq!(envelope.response_type, ResponseType::Similar);
        assert!(envelope.tickets.is_empty());
        assert!(envelope.message.contains("I can help you"));
        assert_eq!(fx.classifier.calls(), 1);
    }

    #[tokio::test]
    async fn classifier_outage_degrades_to_search() {
        let fx = fixture(
            vec![(make_ticket("SCRUM-1", "T"), vec![0.0])],
            vec![0.0],
            MockGuardrail::allowing(),
            MockClassifier::failing(),
            MockTicketClient::new(),
        );
        consume_first_turn(&fx, "s1").await;

        let envelope = fx.orchestrator.handle("s1", "the page is slow").await;

        assert_eq!(envelope.response_type, ResponseType::Similar);
        assert!(envelope.error.is_none());
        assert_eq!(envelope.tickets.len(), 1);
    }

    #[tokio::test]
    async fn dimension_mismatch_requests_rebuild() {
        // Index at dimension 2, query embedding at dimension 3.
        let mut fx = fixture(
            vec![(make_ticket("SCRUM-1", "T"), vec![0.0, 0.0])],
            vec![0.0, 0.0, 0.0],
            MockGuardrail::allowing(),
            MockClassifier::default(),
            MockTicketClient::new(),
        );
        consume_first_turn(&fx, "s1").await;

        let envelope = fx
            .orchestrator
            .handle("s1", "search for export bugs")
            .await;

        assert!(envelope.error.as_deref().unwrap().contains("dimension"));
        assert!(envelope.tickets.is_empty());
        // The corrupted index triggered a rebuild request.
        assert!(fx.sync_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn empty_index_create_proceeds_without_dup_check() {
        let fx = fixture(
            vec![],
            vec![0.0],
            MockGuardrail::allowing(),
            MockClassifier::default(),
            MockTicketClient::new(),
        );

        let envelope = fx
            .orchestrator
            .handle("s1", "create a ticket for missing translations")
            .await;

        assert_eq!(envelope.response_type, ResponseType::Created);
        assert_eq!(fx.tickets.create_calls(), 1);
    }

    #[tokio::test]
    async fn empty_index_search_reports_no_history() {
        let fx = fixture(
            vec![],
            vec![0.0],
            MockGuardrail::allowing(),
            MockClassifier::default(),
            MockTicketClient::new(),
        );

        let envelope = fx
            .orchestrator
            .handle("s1", "check for tickets about exports")
            .await;

        assert_eq!(envelope.response_type, ResponseType::Similar);
        assert!(envelope.tickets.is_empty());
        assert!(envelope.message.contains("No historical ticket data"));
    }

    #[tokio::test]
    async fn turns_accumulate_per_session() {
        let fx = fixture(
            vec![(make_ticket("SCRUM-1", "T"), vec![0.0])],
            vec![0.0],
            MockGuardrail::allowing(),
            MockClassifier::default(),
            MockTicketClient::new(),
        );

        fx.orchestrator.handle("s1", "anything on exports?").await;
        fx.orchestrator
            .handle("s1", "find tickets about the exporter")
            .await;

        let handle = fx.sessions.get_or_create("s1");
        assert_eq!(handle.lock().await.turn_count, 2);

        // A different session is untouched.
        let other = fx.sessions.get_or_create("s2");
        assert_eq!(other.lock().await.turn_count, 0);
    }
}
