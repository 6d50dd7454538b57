use store::{StoreError, TaskStatus};
use thiserror::Error;

/// Represents all error types that can occur in the submission ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The task has not been registered with the ledger.
    #[error("task {0} is not registered with the ledger")]
    UnknownTask(i64),
    /// The student is not in the task's assigned set.
    #[error("student {student_id} is not assigned to task {task_id}")]
    InvalidAssignment { task_id: i64, student_id: i64 },
    /// The due date has passed and the task disallows late submissions.
    #[error("task {0} no longer accepts new submissions")]
    LateSubmission(i64),
    /// An administrative transition was requested from an incompatible status.
    #[error("invalid status transition for task {task_id}: {from} -> {to}")]
    InvalidTransition {
        task_id: i64,
        from: TaskStatus,
        to: TaskStatus,
    },
    /// The durable write failed; in-memory state was left untouched.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}
