use crate::error::StoreError;
use crate::models::submission::Submission;
use crate::models::task::{Task, TaskStatus};
use crate::record_store::{RecordStore, SubmissionFilter};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process [`RecordStore`] backed by hash maps.
///
/// Used by tests and embedded setups; production deployments substitute a
/// database-backed implementation behind the same trait.
#[derive(Default)]
pub struct MemoryStore {
    tasks: RwLock<HashMap<i64, Task>>,
    // keyed by (task_id, student_id) to enforce one row per pair
    submissions: RwLock<HashMap<(i64, i64), Submission>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn put_task(&self, task: &Task) -> Result<(), StoreError> {
        self.tasks.write().await.insert(task.id, task.clone());
        Ok(())
    }

    async fn get_task(&self, task_id: i64) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.read().await.get(&task_id).cloned())
    }

    async fn set_task_status(&self, task_id: i64, status: TaskStatus) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(&task_id)
            .ok_or_else(|| StoreError::NotFound(format!("task {task_id}")))?;
        task.status = status;
        task.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn put_submission(&self, submission: &Submission) -> Result<(), StoreError> {
        self.submissions
            .write()
            .await
            .insert((submission.task_id, submission.student_id), submission.clone());
        Ok(())
    }

    async fn find_submissions(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<Submission>, StoreError> {
        let mut found: Vec<Submission> = self
            .submissions
            .read()
            .await
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        found.sort_by_key(|s| (s.task_id, s.student_id));
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashSet;

    fn sample_task(id: i64) -> Task {
        let now = Utc::now();
        Task {
            id,
            title: format!("Task {id}"),
            rubric: vec![],
            assigned_student_ids: HashSet::from([1, 2]),
            status: TaskStatus::Pending,
            allow_late_submissions: true,
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn put_and_get_task_round_trips() {
        let store = MemoryStore::new();
        let task = sample_task(7);
        store.put_task(&task).await.unwrap();
        assert_eq!(store.get_task(7).await.unwrap(), Some(task));
        assert_eq!(store.get_task(8).await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_task_status_updates_row() {
        let store = MemoryStore::new();
        store.put_task(&sample_task(1)).await.unwrap();
        store
            .set_task_status(1, TaskStatus::Submitted)
            .await
            .unwrap();
        let task = store.get_task(1).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Submitted);

        let missing = store.set_task_status(99, TaskStatus::Graded).await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn submission_upsert_is_keyed_by_pair() {
        let store = MemoryStore::new();
        let mut submission = Submission::new(1, 7, 1, Utc::now());
        store.put_submission(&submission).await.unwrap();

        submission.feedback = Some("ok".to_string());
        store.put_submission(&submission).await.unwrap();

        let all = store
            .find_submissions(&SubmissionFilter::for_task(7))
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].feedback.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn filter_matches_on_fields() {
        let store = MemoryStore::new();
        let mut graded = Submission::new(1, 7, 1, Utc::now());
        graded.raw_score = Some(80.0);
        let ungraded = Submission::new(2, 7, 2, Utc::now());
        let other_task = Submission::new(3, 8, 1, Utc::now());
        for s in [&graded, &ungraded, &other_task] {
            store.put_submission(s).await.unwrap();
        }

        let by_task = store
            .find_submissions(&SubmissionFilter::for_task(7))
            .await
            .unwrap();
        assert_eq!(by_task.len(), 2);

        let graded_only = store
            .find_submissions(&SubmissionFilter {
                task_id: Some(7),
                graded: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(graded_only.len(), 1);
        assert_eq!(graded_only[0].student_id, 1);

        let by_student = store
            .find_submissions(&SubmissionFilter {
                student_id: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_student.len(), 2);
    }
}
