//! Sync pipeline: keeps the vector index consistent with the remote
//! tracker.
//!
//! Each run is a full refresh — fetch every ticket, embed each one exactly
//! once, build a new snapshot at generation + 1, publish it atomically. A
//! failed run leaves the previous snapshot untouched. At most one run is in
//! progress at a time; a run requested while one is active is coalesced
//! into a no-op acknowledgment rather than queued.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use jira::Ticket;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::index::{IndexSnapshot, VectorIndex};
use super::traits::{Embedder, SimilarityError};
use super::types::SyncStats;
use crate::config::SyncSettings;
use crate::domain::tickets::{TicketClient, TicketError};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] TicketError),

    #[error(transparent)]
    Similarity(#[from] SimilarityError),
}

/// Result of asking the pipeline to run.
#[derive(Debug)]
pub enum SyncOutcome {
    Completed(SyncStats),
    /// Another run held the permit; the request was coalesced.
    AlreadyRunning,
}

/// Marker sent down the request channel to ask for an on-demand run.
#[derive(Debug)]
pub struct SyncRequest;

/// One ticket, one canonical text, one embedding. Field order is fixed so
/// the representation is stable across runs.
fn canonical_text(ticket: &Ticket) -> String {
    format!(
        "Key: {} | Summary: {} | Description: {} | Status: {} | Priority: {}",
        ticket.key, ticket.summary, ticket.description, ticket.status, ticket.priority
    )
}

pub struct SyncPipeline<E, C>
where
    E: Embedder,
    C: TicketClient,
{
    embedder: E,
    tickets: C,
    index: Arc<VectorIndex>,
    in_flight: AtomicBool,
    starts: AtomicU64,
}

impl<E, C> SyncPipeline<E, C>
where
    E: Embedder,
    C: TicketClient,
{
    pub fn new(embedder: E, tickets: C, index: Arc<VectorIndex>) -> Self {
        Self {
            embedder,
            tickets,
            index,
            in_flight: AtomicBool::new(false),
            starts: AtomicU64::new(0),
        }
    }

    /// Whether a run currently holds the single-flight permit.
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// How many pipeline executions have actually started (coalesced
    /// requests don't count).
    pub fn starts(&self) -> u64 {
        self.starts.load(Ordering::SeqCst)
    }

    /// Run one full sync. Returns `AlreadyRunning` without doing anything
    /// if another run holds the permit.
    #[tracing::instrument(name = "SyncPipeline::run", skip(self))]
    pub async fn run(&self) -> Result<SyncOutcome, SyncError> {
        // The permit is released by the guard's Drop on every exit path, so
        // a failed run can never wedge future syncs.
        let Some(_permit) = SyncPermit::acquire(&self.in_flight) else {
            info!("Sync already in progress, coalescing request");
            return Ok(SyncOutcome::AlreadyRunning);
        };
        self.starts.fetch_add(1, Ordering::SeqCst);

        info!("Starting ticket sync");

        let tickets = self.tickets.fetch_all().await?;
        debug!(count = tickets.len(), "Fetched tickets");

        let texts: Vec<String> = tickets.iter().map(canonical_text).collect();
        let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let embeddings = self.embedder.embed_batch(&text_refs).await?;

        if embeddings.len() != tickets.len() {
            return Err(SimilarityError::EmbeddingError(format!(
                "expected {} embeddings, got {}",
                tickets.len(),
                embeddings.len()
            ))
            .into());
        }

        let generation = self.index.snapshot().generation() + 1;
        let entries: Vec<(Ticket, Vec<f32>)> =
            tickets.into_iter().zip(embeddings).collect();
        let snapshot = IndexSnapshot::build(entries, generation)?;

        let stats = SyncStats {
            tickets_indexed: snapshot.len(),
            generation,
        };
        self.index.publish(snapshot);

        info!(
            tickets = stats.tickets_indexed,
            generation = stats.generation,
            "Ticket sync completed"
        );

        Ok(SyncOutcome::Completed(stats))
    }
}

struct SyncPermit<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SyncPermit<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
            .then_some(Self { flag })
    }
}

impl Drop for SyncPermit<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Background worker: optional run at startup, then a recurring interval,
/// plus on-demand runs via the request channel. All three paths go through
/// the same single-flight permit.
pub async fn run_sync_worker<E, C>(
    pipeline: Arc<SyncPipeline<E, C>>,
    settings: SyncSettings,
    mut requests: mpsc::Receiver<SyncRequest>,
) where
    E: Embedder,
    C: TicketClient,
{
    info!(
        interval_secs = settings.interval_secs,
        on_startup = settings.on_startup,
        "Ticket sync worker started"
    );

    if settings.on_startup {
        run_and_log(&pipeline).await;
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(settings.interval_secs));
    // Consume the immediate first tick; the startup run already covered it.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_and_log(&pipeline).await;
            }
            request = requests.recv() => match request {
                Some(SyncRequest) => run_and_log(&pipeline).await,
                None => {
                    info!("Sync request channel closed, stopping worker");
                    break;
                }
            }
        }
    }
}

async fn run_and_log<E, C>(pipeline: &SyncPipeline<E, C>)
where
    E: Embedder,
    C: TicketClient,
{
    match pipeline.run().await {
        Ok(SyncOutcome::Completed(stats)) => {
            debug!(
                tickets = stats.tickets_indexed,
                generation = stats.generation,
                "Sync cycle completed"
            );
        }
        Ok(SyncOutcome::AlreadyRunning) => {
            debug!("Sync cycle coalesced into the active run");
        }
        Err(e) => {
            // The previous snapshot stays live; the next cycle retries.
            error!(error = %e, "Sync cycle failed");
        }
    }
}
