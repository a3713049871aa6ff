//! Mock oracles for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::{Guardrail, IntentClassifier, OracleError, Result, Validation};
use crate::domain::routing::RoutingDecision;
use crate::domain::session::TurnContext;

/// Guardrail with a scripted verdict and a call counter.
#[derive(Clone)]
pub struct MockGuardrail {
    verdict: Validation,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockGuardrail {
    /// Accept every request.
    pub fn allowing() -> Self {
        Self {
            verdict: Validation::valid(),
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Reject every request with the given reason.
    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            verdict: Validation::rejected(reason),
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail every call at the transport level.
    pub fn failing() -> Self {
        Self {
            verdict: Validation::valid(),
            fail: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Guardrail for MockGuardrail {
    async fn validate(&self, _text: &str) -> Result<Validation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(OracleError::Guardrail("mock guardrail failure".into()));
        }
        Ok(self.verdict.clone())
    }
}

/// Classifier with a fixed answer and a call counter.
#[derive(Clone)]
pub struct MockClassifier {
    decision: RoutingDecision,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockClassifier {
    pub fn returning(decision: RoutingDecision) -> Self {
        Self {
            decision,
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail every call at the transport level.
    pub fn failing() -> Self {
        Self {
            decision: RoutingDecision::Search,
            fail: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::returning(RoutingDecision::Search)
    }
}

#[async_trait]
impl IntentClassifier for MockClassifier {
    async fn classify(
        &self,
        _text: &str,
        _context: Option<&TurnContext>,
    ) -> Result<RoutingDecision> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(OracleError::Classifier("mock classifier failure".into()));
        }
        Ok(self.decision)
    }
}
