//! Similarity search over indexed tickets.
//!
//! This module keeps an in-memory vector index of the remote ticket set and
//! answers "what existing tickets look like this request":
//!
//! - **Vector index** — immutable snapshots published by atomic pointer
//!   swap; readers never see a half-built index
//! - **Similarity engine** — squared-Euclidean nearest neighbors converted
//!   to `1 / (1 + d)` scores and filtered by threshold
//! - **Sync pipeline** — periodic full refresh from the tracker with a
//!   single-flight guard
//!
//! # Architecture
//!
//! The embedding provider sits behind the [`Embedder`] trait so tests run
//! against mocks:
//!
//! - [`Embedder`] - text embedding generation (OpenAI, mocks)
//!
//! # Example
//!
//! ```ignore
//! use triage_api::domain::similarity::{SimilarityConfig, SimilarityEngine, VectorIndex};
//!
//! let engine = SimilarityEngine::new(embedder, index, SimilarityConfig::default());
//! let results = engine.search("payment gateway timeout").await?;
//! ```
//!
//! # Syncing
//!
//! Use [`SyncPipeline`] to refresh the index from the tracker:
//!
//! ```ignore
//! let pipeline = SyncPipeline::new(embedder, ticket_client, index);
//! let outcome = pipeline.run().await?;
//! ```

mod engine;
mod index;
mod sync;
mod traits;
mod types;

pub mod embedder;

pub use engine::{SimilarityConfig, SimilarityEngine};
pub use index::{IndexSnapshot, VectorIndex};
pub use sync::{run_sync_worker, SyncError, SyncOutcome, SyncPipeline, SyncRequest};
pub use traits::{Embedder, SimilarityError};
pub use types::{IndexedTicket, SimilarityResult, SyncStats};
