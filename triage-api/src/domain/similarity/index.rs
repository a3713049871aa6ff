//! In-memory vector index with atomically swappable snapshots.
//!
//! The index is rebuilt wholesale by the sync pipeline: a new
//! [`IndexSnapshot`] is fully built off to the side and then published by
//! swapping a single `Arc`. Readers clone the `Arc` at query start and keep
//! using that snapshot even if a publish happens mid-query, so they never
//! observe a half-updated index.

use std::sync::{Arc, RwLock};

use jira::Ticket;

use super::traits::{Result, SimilarityError};
use super::types::IndexedTicket;

/// One immutable, fully-built generation of the index.
///
/// All entries share one embedding dimension; a snapshot either builds
/// completely or not at all.
#[derive(Debug)]
pub struct IndexSnapshot {
    generation: u64,
    dimension: usize,
    entries: Vec<IndexedTicket>,
}

impl IndexSnapshot {
    /// The pre-first-sync snapshot: generation 0, no entries.
    pub fn empty() -> Self {
        Self {
            generation: 0,
            dimension: 0,
            entries: Vec::new(),
        }
    }

    /// Build a snapshot from tickets and their embeddings.
    ///
    /// Fails with `DimensionMismatch` if the embeddings do not all share one
    /// dimension; nothing is published in that case.
    pub fn build(entries: Vec<(Ticket, Vec<f32>)>, generation: u64) -> Result<Self> {
        let dimension = entries.first().map(|(_, e)| e.len()).unwrap_or(0);

        let entries = entries
            .into_iter()
            .map(|(ticket, embedding)| {
                if embedding.len() != dimension {
                    return Err(SimilarityError::DimensionMismatch {
                        expected: dimension,
                        actual: embedding.len(),
                    });
                }
                Ok(IndexedTicket {
                    ticket,
                    embedding,
                    generation,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            generation,
            dimension,
            entries,
        })
    }

    /// Nearest neighbors of `embedding`, at most `k`, ordered by ascending
    /// squared Euclidean distance. Ties keep insertion order (stable sort)
    /// so results are deterministic.
    ///
    /// Fails with `EmptyIndex` when the snapshot has no entries; callers
    /// treat that as "no data", not a fault.
    pub fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<(&Ticket, f32)>> {
        if self.entries.is_empty() {
            return Err(SimilarityError::EmptyIndex);
        }
        if embedding.len() != self.dimension {
            return Err(SimilarityError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        let mut hits: Vec<(&Ticket, f32)> = self
            .entries
            .iter()
            .map(|entry| (&entry.ticket, squared_distance(&entry.embedding, embedding)))
            .collect();

        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits.truncate(k);

        Ok(hits)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Holder for the currently published snapshot.
///
/// `publish` swaps a single pointer under a briefly held lock; readers take
/// the lock only long enough to clone the `Arc`, so they never wait on the
/// sync pipeline.
#[derive(Debug)]
pub struct VectorIndex {
    current: RwLock<Arc<IndexSnapshot>>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(IndexSnapshot::empty())),
        }
    }

    /// The currently published snapshot. The returned `Arc` stays valid
    /// across publishes (snapshot isolation).
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Atomically replace the published snapshot.
    pub fn publish(&self, snapshot: IndexSnapshot) {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = Arc::new(snapshot);
    }
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_ticket(key: &str, summary: &str) -> Ticket {
        Ticket {
            key: key.to_string(),
            summary: summary.to_string(),
            description: "Description".to_string(),
            status: "To Do".to_string(),
            priority: "Medium".to_string(),
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let a = [0.3, -1.2, 4.0];
        let b = [2.0, 0.5, -0.7];
        assert_eq!(squared_distance(&a, &b), squared_distance(&b, &a));
        assert_eq!(squared_distance(&a, &a), 0.0);
    }

    #[test]
    fn build_rejects_mixed_dimensions() {
        let entries = vec![
            (make_ticket("SCRUM-1", "A"), vec![1.0, 0.0]),
            (make_ticket("SCRUM-2", "B"), vec![1.0, 0.0, 0.0]),
        ];

        let err = IndexSnapshot::build(entries, 1).unwrap_err();
        assert!(matches!(
            err,
            SimilarityError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn query_orders_by_ascending_distance() {
        let entries = vec![
            (make_ticket("SCRUM-1", "far"), vec![3.0, 0.0]),
            (make_ticket("SCRUM-2", "near"), vec![1.0, 0.0]),
            (make_ticket("SCRUM-3", "exact"), vec![0.0, 0.0]),
        ];
        let snapshot = IndexSnapshot::build(entries, 1).unwrap();

        let hits = snapshot.query(&[0.0, 0.0], 3).unwrap();
        let keys: Vec<&str> = hits.iter().map(|(t, _)| t.key.as_str()).collect();
        assert_eq!(keys, vec!["SCRUM-3", "SCRUM-2", "SCRUM-1"]);
        assert_eq!(hits[0].1, 0.0);
        assert_eq!(hits[1].1, 1.0);
        assert_eq!(hits[2].1, 9.0);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let entries = vec![
            (make_ticket("SCRUM-1", "first"), vec![1.0, 0.0]),
            (make_ticket("SCRUM-2", "second"), vec![-1.0, 0.0]),
            (make_ticket("SCRUM-3", "third"), vec![0.0, 1.0]),
        ];
        let snapshot = IndexSnapshot::build(entries, 1).unwrap();

        // All three are at distance 1 from the origin.
        let hits = snapshot.query(&[0.0, 0.0], 3).unwrap();
        let keys: Vec<&str> = hits.iter().map(|(t, _)| t.key.as_str()).collect();
        assert_eq!(keys, vec!["SCRUM-1", "SCRUM-2", "SCRUM-3"]);
    }

    #[test]
    fn query_returns_at_most_k() {
        let entries = (0..5)
            .map(|i| (make_ticket(&format!("SCRUM-{}", i), "T"), vec![i as f32]))
            .collect();
        let snapshot = IndexSnapshot::build(entries, 1).unwrap();

        assert_eq!(snapshot.query(&[0.0], 2).unwrap().len(), 2);
        assert_eq!(snapshot.query(&[0.0], 10).unwrap().len(), 5);
    }

    #[test]
    fn empty_snapshot_query_is_empty_index() {
        let snapshot = IndexSnapshot::empty();
        assert!(matches!(
            snapshot.query(&[1.0], 5),
            Err(SimilarityError::EmptyIndex)
        ));
    }

    #[test]
    fn query_rejects_wrong_dimension() {
        let entries = vec![(make_ticket("SCRUM-1", "A"), vec![1.0, 0.0])];
        let snapshot = IndexSnapshot::build(entries, 1).unwrap();

        assert!(matches!(
            snapshot.query(&[1.0, 0.0, 0.0], 5),
            Err(SimilarityError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn readers_keep_their_snapshot_across_publish() {
        let index = VectorIndex::new();
        index.publish(
            IndexSnapshot::build(vec![(make_ticket("SCRUM-1", "old"), vec![0.0, 0.0])], 1)
                .unwrap(),
        );

        // A reader acquires the snapshot before the next publish...
        let held = index.snapshot();
        assert_eq!(held.generation(), 1);

        index.publish(
            IndexSnapshot::build(
                vec![(make_ticket("SCRUM-2", "new"), vec![0.0, 0.0, 0.0])],
                2,
            )
            .unwrap(),
        );

        // ...and its in-flight query still runs against the pre-swap data,
        // with the pre-swap dimension.
        let hits = held.query(&[0.0, 0.0], 5).unwrap();
        assert_eq!(hits[0].0.key, "SCRUM-1");

        // New readers see the new generation.
        assert_eq!(index.snapshot().generation(), 2);
        assert_eq!(index.snapshot().dimension(), 3);
    }
}
