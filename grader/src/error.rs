use ledger::LedgerError;
use std::time::Duration;
use thiserror::Error;

/// Failures of a single oracle call.
///
/// Transport problems and timeouts are transient and worth one retry;
/// a malformed response is deterministic and never retried.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OracleError {
    #[error("oracle transport failure: {0}")]
    Transport(String),
    #[error("oracle call timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed oracle response: {0}")]
    MalformedResponse(String),
}

impl OracleError {
    pub fn is_transient(&self) -> bool {
        !matches!(self, OracleError::MalformedResponse(_))
    }
}

/// Structural failures that abort a whole batch before any oracle call.
#[derive(Debug, Error)]
pub enum GradeError {
    #[error("task has no rubric; nothing to grade against")]
    NoRubric,
    #[error("no students selected for grading")]
    NoStudentsSelected,
    #[error("task {0} is not registered with the ledger")]
    UnknownTask(i64),
}

/// A per-student failure inside a batch; recorded in the report, never thrown.
#[derive(Debug, Error)]
pub enum StudentGradeError {
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
