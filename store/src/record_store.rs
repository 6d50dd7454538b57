use crate::error::StoreError;
use crate::models::submission::Submission;
use crate::models::task::{Task, TaskStatus};
use async_trait::async_trait;

/// Field filter for submission queries.
///
/// Unset fields match everything, so an empty filter returns all submissions.
#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    pub task_id: Option<i64>,
    pub student_id: Option<i64>,
    pub graded: Option<bool>,
}

impl SubmissionFilter {
    pub fn for_task(task_id: i64) -> Self {
        Self {
            task_id: Some(task_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, submission: &Submission) -> bool {
        if let Some(task_id) = self.task_id {
            if submission.task_id != task_id {
                return false;
            }
        }
        if let Some(student_id) = self.student_id {
            if submission.student_id != student_id {
                return false;
            }
        }
        if let Some(graded) = self.graded {
            if submission.is_graded() != graded {
                return false;
            }
        }
        true
    }
}

/// Async CRUD + filter capability over tasks and submissions.
///
/// Writes are upserts keyed by primary key (tasks) or by
/// `(task_id, student_id)` (submissions), mirroring how the ledger mutates
/// records in place.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn put_task(&self, task: &Task) -> Result<(), StoreError>;

    async fn get_task(&self, task_id: i64) -> Result<Option<Task>, StoreError>;

    /// Persist a task's status without rewriting the rest of the row.
    async fn set_task_status(&self, task_id: i64, status: TaskStatus) -> Result<(), StoreError>;

    async fn put_submission(&self, submission: &Submission) -> Result<(), StoreError>;

    async fn find_submissions(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<Submission>, StoreError>;
}
