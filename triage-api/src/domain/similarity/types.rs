//! Core types for the similarity domain.

use jira::Ticket;

/// A ticket paired with the embedding it was indexed under.
///
/// Created only by the sync pipeline and immutable afterwards; the
/// generation ties the entry to the snapshot it belongs to.
#[derive(Debug, Clone)]
pub struct IndexedTicket {
    pub ticket: Ticket,
    pub embedding: Vec<f32>,
    pub generation: u64,
}

/// A ticket matched by a similarity query, scored in `[0.0, 1.0]` where 1.0
/// means an identical embedding.
#[derive(Debug, Clone)]
pub struct SimilarityResult {
    pub ticket: Ticket,
    pub score: f64,
}

/// Statistics from one successful sync run.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    pub tickets_indexed: usize,
    pub generation: u64,
}
