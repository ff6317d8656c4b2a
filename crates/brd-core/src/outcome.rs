//! Per-run outcome accumulation, indexed by identifier.

use std::collections::HashMap;

/// Result of a single download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Human-readable reason, tagged by the fetch layer so transport,
    /// protocol, and local I/O failures stay distinguishable downstream.
    Failure(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Outcome for one identifier, as emitted by a fetch worker.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub id: String,
    pub outcome: Outcome,
}

impl ItemOutcome {
    pub fn success(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            outcome: Outcome::Success,
        }
    }

    pub fn failure(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            outcome: Outcome::Failure(reason.into()),
        }
    }
}

/// Write-once-per-identifier collection of one run's outcomes.
///
/// Items skipped because their artifact already existed are recorded as an
/// implicit success via [`OutcomeLedger::record_present`]; downstream
/// consumers cannot tell them apart from fresh downloads, by contract.
#[derive(Debug, Default)]
pub struct OutcomeLedger {
    entries: HashMap<String, Outcome>,
}

impl OutcomeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the ledger from the dispatcher's drained output.
    pub fn from_outcomes(outcomes: Vec<ItemOutcome>) -> Self {
        let mut ledger = Self::new();
        for o in outcomes {
            ledger.entries.insert(o.id, o.outcome);
        }
        ledger
    }

    /// Record an item whose artifact was already present before the run.
    pub fn record_present(&mut self, id: &str) {
        self.entries
            .entry(id.to_string())
            .or_insert(Outcome::Success);
    }

    pub fn lookup(&self, id: &str) -> Option<&Outcome> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
