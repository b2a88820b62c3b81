use crate::config::Strategy;
use std::fmt;
use thiserror::Error;

/// Reference data that must be present before scheduling can start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingInput {
    Labs,
    Faculties,
    Workloads,
    /// Workloads exist but none of them yields a practical session.
    Demands,
}

impl fmt::Display for MissingInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            MissingInput::Labs => "no labs configured",
            MissingInput::Faculties => "no faculty records",
            MissingInput::Workloads => "no workload records",
            MissingInput::Demands => "no workload qualifies as a practical session",
        };
        f.write_str(what)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    AttemptLimit,
    Timeout,
    Cancelled,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            AbortReason::AttemptLimit => "attempt limit reached",
            AbortReason::Timeout => "timed out",
            AbortReason::Cancelled => "cancelled",
        };
        f.write_str(what)
    }
}

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, Error)]
#[error("{collection} store: {message}")]
pub struct StoreError {
    pub collection: &'static str,
    pub message: String,
}

impl StoreError {
    pub fn new(collection: &'static str, message: impl Into<String>) -> Self {
        Self {
            collection,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("Missing input: {0}")]
    MissingInput(MissingInput),

    #[error("Infeasible: search exhausted after placing at most {placed} of {total} sessions")]
    Infeasible { placed: usize, total: usize },

    #[error("Search aborted ({reason}) after {attempts} attempts")]
    SearchAborted { reason: AbortReason, attempts: u64 },

    #[error("Strategy '{0}' is not available in this build")]
    StrategyUnavailable(Strategy),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, GenerationError>;
