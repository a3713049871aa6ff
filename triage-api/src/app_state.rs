use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::Settings;
use crate::domain::oracle::{OpenAiClassifier, OpenAiGuardrail, OracleError};
use crate::domain::similarity::{
    embedder::OpenAiEmbedder, SimilarityConfig, SimilarityEngine, SimilarityError, SyncPipeline,
    SyncRequest, VectorIndex,
};
use crate::domain::tickets::JiraTicketClient;
use crate::domain::{Orchestrator, SessionStore};

pub type AppOrchestrator =
    Orchestrator<OpenAiEmbedder, JiraTicketClient, OpenAiGuardrail, OpenAiClassifier>;
pub type AppSyncPipeline = SyncPipeline<OpenAiEmbedder, JiraTicketClient>;

#[derive(Debug, thiserror::Error)]
pub enum AppStateError {
    #[error("Failed to create Jira client: {0}")]
    Jira(#[from] jira::JiraError),
    #[error("Failed to create embedder: {0}")]
    Embedder(#[from] SimilarityError),
    #[error("Failed to create oracle client: {0}")]
    Oracle(#[from] OracleError),
}

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AppOrchestrator>,
    pub index: Arc<VectorIndex>,
    pub pipeline: Arc<AppSyncPipeline>,
}

impl AppState {
    /// Wire up the full dependency graph. Returns the state plus the
    /// receiving end of the sync-request channel for the background worker.
    pub fn new(
        settings: &Settings,
    ) -> Result<(Self, mpsc::Receiver<SyncRequest>), AppStateError> {
        let jira_client = jira::JiraClient::new(
            &settings.jira.base_url,
            &settings.jira.email,
            &settings.jira.api_token,
            &settings.jira.project_key,
        )?;
        let tickets = JiraTicketClient::new(jira_client);

        let embedder = OpenAiEmbedder::new(&settings.openai)?;
        let guardrail = OpenAiGuardrail::new(&settings.openai)?;
        let classifier = OpenAiClassifier::new(&settings.openai)?;

        let index = Arc::new(VectorIndex::new());
        let engine = SimilarityEngine::new(
            embedder.clone(),
            index.clone(),
            SimilarityConfig::from(&settings.similarity),
        );
        let pipeline = Arc::new(SyncPipeline::new(
            embedder,
            tickets.clone(),
            index.clone(),
        ));

        let sessions = SessionStore::new(&settings.session);
        let (sync_tx, sync_rx) = mpsc::channel(8);

        let orchestrator = Arc::new(Orchestrator::new(
            engine, tickets, guardrail, classifier, sessions, sync_tx,
        ));

        Ok((
            Self {
                orchestrator,
                index,
                pipeline,
            },
            sync_rx,
        ))
    }
}
