//! Shared test doubles for crates that persist through [`RecordStore`].

use crate::error::StoreError;
use crate::memory::MemoryStore;
use crate::models::submission::Submission;
use crate::models::task::{Task, TaskStatus};
use crate::record_store::{RecordStore, SubmissionFilter};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};

/// A [`RecordStore`] that delegates to [`MemoryStore`] but can be switched to
/// fail every write, for exercising persistence-failure paths.
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("simulated outage".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn put_task(&self, task: &Task) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.put_task(task).await
    }

    async fn get_task(&self, task_id: i64) -> Result<Option<Task>, StoreError> {
        self.inner.get_task(task_id).await
    }

    async fn set_task_status(&self, task_id: i64, status: TaskStatus) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.set_task_status(task_id, status).await
    }

    async fn put_submission(&self, submission: &Submission) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.put_submission(submission).await
    }

    async fn find_submissions(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<Submission>, StoreError> {
        self.inner.find_submissions(filter).await
    }
}
