use crate::error::LedgerError;
use crate::fingerprint::compute_content_hash;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use store::{RecordStore, Submission, SubmissionFilter, Task, TaskStatus};
use tokio::sync::Mutex;

/// Writable fields of a submission.
///
/// An upsert replaces the stored values with these wholesale; only `id` and
/// `submitted_at` survive from an existing record (the latter unless
/// explicitly overridden here).
#[derive(Debug, Clone, Default)]
pub struct SubmissionFields {
    pub content: Option<String>,
    pub raw_score: Option<f64>,
    pub scaled_score: Option<i64>,
    pub per_criterion_scores: HashMap<String, f64>,
    pub feedback: Option<String>,
    /// Override for the submission timestamp; defaults to the existing value
    /// (resubmission) or now (first submission).
    pub submitted_at: Option<DateTime<Utc>>,
}

impl SubmissionFields {
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }
}

/// Per-task state guarded by that task's mutex.
struct TaskSlot {
    task: Task,
    /// One submission per student.
    submissions: HashMap<i64, Submission>,
    /// Fingerprint -> students holding it, for O(1) collision lookups.
    hash_index: HashMap<String, HashSet<i64>>,
}

impl TaskSlot {
    fn new(task: Task) -> Self {
        Self {
            task,
            submissions: HashMap::new(),
            hash_index: HashMap::new(),
        }
    }

    fn index_submission(&mut self, submission: &Submission) {
        if let Some(hash) = &submission.content_hash {
            self.hash_index
                .entry(hash.clone())
                .or_default()
                .insert(submission.student_id);
        }
    }

    fn unindex_student(&mut self, student_id: i64) {
        if let Some(prev) = self.submissions.get(&student_id) {
            if let Some(hash) = &prev.content_hash {
                if let Some(holders) = self.hash_index.get_mut(hash) {
                    holders.remove(&student_id);
                    if holders.is_empty() {
                        self.hash_index.remove(hash);
                    }
                }
            }
        }
    }

    /// True when another student on this task holds the same fingerprint.
    fn collides(&self, hash: &str, student_id: i64) -> bool {
        self.hash_index
            .get(hash)
            .map(|holders| holders.iter().any(|&s| s != student_id))
            .unwrap_or(false)
    }
}

/// Maintains the submissions of registered tasks and owns their status.
///
/// Mutations to one task are serialized behind a per-task async mutex;
/// operations on different tasks share no lock. Durable writes go to the
/// record store first; the in-memory mirror is only updated once the store
/// confirmed them, so a [`LedgerError::Persistence`] leaves memory unchanged.
pub struct SubmissionLedger<S> {
    store: Arc<S>,
    next_submission_id: AtomicI64,
    // Only guards the map itself; never held across an await.
    slots: StdMutex<HashMap<i64, Arc<Mutex<TaskSlot>>>>,
}

impl<S: RecordStore> SubmissionLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            next_submission_id: AtomicI64::new(1),
            slots: StdMutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Register a task with the ledger, hydrating any submissions the store
    /// already holds for it (restart recovery, administrative re-edit).
    pub async fn register_task(&self, task: Task) -> Result<(), LedgerError> {
        let task_id = task.id;
        self.store.put_task(&task).await?;

        let existing = self
            .store
            .find_submissions(&SubmissionFilter::for_task(task_id))
            .await?;

        let mut slot = TaskSlot::new(task);
        for submission in existing {
            self.next_submission_id
                .fetch_max(submission.id + 1, Ordering::SeqCst);
            slot.index_submission(&submission);
            slot.submissions.insert(submission.student_id, submission);
        }

        self.slots
            .lock()
            .expect("slot map poisoned")
            .insert(task_id, Arc::new(Mutex::new(slot)));
        Ok(())
    }

    fn slot(&self, task_id: i64) -> Result<Arc<Mutex<TaskSlot>>, LedgerError> {
        self.slots
            .lock()
            .expect("slot map poisoned")
            .get(&task_id)
            .cloned()
            .ok_or(LedgerError::UnknownTask(task_id))
    }

    /// Current snapshot of a registered task.
    pub async fn task(&self, task_id: i64) -> Result<Task, LedgerError> {
        let slot = self.slot(task_id)?;
        let slot = slot.lock().await;
        Ok(slot.task.clone())
    }

    /// All submissions for a task, ordered by student id.
    pub async fn submissions(&self, task_id: i64) -> Result<Vec<Submission>, LedgerError> {
        let slot = self.slot(task_id)?;
        let slot = slot.lock().await;
        let mut all: Vec<Submission> = slot.submissions.values().cloned().collect();
        all.sort_by_key(|s| s.student_id);
        Ok(all)
    }

    /// The submission for `(task_id, student_id)`, if the student submitted.
    pub async fn submission(
        &self,
        task_id: i64,
        student_id: i64,
    ) -> Result<Option<Submission>, LedgerError> {
        let slot = self.slot(task_id)?;
        let slot = slot.lock().await;
        Ok(slot.submissions.get(&student_id).cloned())
    }

    /// True iff another student on `task_id` already submitted content with
    /// this fingerprint.
    pub async fn detect_plagiarism(
        &self,
        task_id: i64,
        student_id: i64,
        hash: &str,
    ) -> Result<bool, LedgerError> {
        let slot = self.slot(task_id)?;
        let slot = slot.lock().await;
        Ok(slot.collides(hash, student_id))
    }

    /// Create or update the submission for `(task_id, student_id)`.
    ///
    /// The fingerprint is computed first when content is present. On a
    /// collision with a different student the task becomes
    /// [`TaskStatus::Plagiarized`] and the submission is still stored;
    /// otherwise any non-plagiarized task becomes [`TaskStatus::Submitted`].
    pub async fn upsert_submission(
        &self,
        task_id: i64,
        student_id: i64,
        fields: SubmissionFields,
    ) -> Result<Submission, LedgerError> {
        let slot_arc = self.slot(task_id)?;
        let mut slot = slot_arc.lock().await;

        if !slot.task.is_assigned(student_id) {
            return Err(LedgerError::InvalidAssignment {
                task_id,
                student_id,
            });
        }

        let now = Utc::now();
        let existing = slot.submissions.get(&student_id).cloned();

        if existing.is_none() && slot.task.rejects_submissions_at(now) {
            return Err(LedgerError::LateSubmission(task_id));
        }

        let hash = fields.content.as_deref().map(compute_content_hash);
        let collision = hash
            .as_ref()
            .map(|h| slot.collides(h, student_id))
            .unwrap_or(false);

        let mut record = match &existing {
            Some(prev) => {
                let mut record = prev.clone();
                record.submitted_at = fields.submitted_at.unwrap_or(prev.submitted_at);
                record
            }
            None => Submission::new(
                self.next_submission_id.fetch_add(1, Ordering::SeqCst),
                task_id,
                student_id,
                fields.submitted_at.unwrap_or(now),
            ),
        };
        record.content = fields.content;
        record.content_hash = hash;
        record.raw_score = fields.raw_score;
        record.scaled_score = fields.scaled_score;
        record.per_criterion_scores = fields.per_criterion_scores;
        record.feedback = fields.feedback;
        record.updated_at = now;

        let next_status = if collision {
            TaskStatus::Plagiarized
        } else if slot.task.status == TaskStatus::Plagiarized {
            // Terminal for automatic transitions; only reset() leaves it.
            TaskStatus::Plagiarized
        } else {
            TaskStatus::Submitted
        };

        // Durable writes first; memory stays untouched on failure.
        self.store.put_submission(&record).await?;
        if next_status != slot.task.status {
            self.store.set_task_status(task_id, next_status).await?;
            tracing::info!(
                task_id,
                from = %slot.task.status,
                to = %next_status,
                "task status transition"
            );
        }
        if collision {
            tracing::warn!(task_id, student_id, "duplicate submission content across students");
        }

        slot.unindex_student(student_id);
        slot.index_submission(&record);
        slot.submissions.insert(student_id, record.clone());
        if next_status != slot.task.status {
            slot.task.status = next_status;
            slot.task.updated_at = now;
        }

        Ok(record)
    }

    /// Administrative grade commit: `Submitted -> Graded` only. Graded-ness is
    /// never inferred from score presence.
    pub async fn commit_grade(&self, task_id: i64) -> Result<Task, LedgerError> {
        self.administrative_transition(task_id, TaskStatus::Graded, |from| {
            from == TaskStatus::Submitted
        })
        .await
    }

    /// Administrative reset: any status back to `Pending`.
    pub async fn reset(&self, task_id: i64) -> Result<Task, LedgerError> {
        self.administrative_transition(task_id, TaskStatus::Pending, |_| true)
            .await
    }

    /// Optional manual transition `Pending -> InProgress`.
    pub async fn mark_in_progress(&self, task_id: i64) -> Result<Task, LedgerError> {
        self.administrative_transition(task_id, TaskStatus::InProgress, |from| {
            from == TaskStatus::Pending
        })
        .await
    }

    async fn administrative_transition(
        &self,
        task_id: i64,
        to: TaskStatus,
        allowed_from: impl Fn(TaskStatus) -> bool,
    ) -> Result<Task, LedgerError> {
        let slot_arc = self.slot(task_id)?;
        let mut slot = slot_arc.lock().await;

        let from = slot.task.status;
        if !allowed_from(from) {
            return Err(LedgerError::InvalidTransition { task_id, from, to });
        }
        if from == to {
            return Ok(slot.task.clone());
        }

        self.store.set_task_status(task_id, to).await?;
        tracing::info!(task_id, from = %from, to = %to, "administrative status transition");

        slot.task.status = to;
        slot.task.updated_at = Utc::now();
        Ok(slot.task.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use store::test_utils::FailingStore;
    use store::{MemoryStore, RubricCriterion};

    fn make_task(id: i64, students: &[i64]) -> Task {
        let now = Utc::now();
        Task {
            id,
            title: format!("Task {id}"),
            rubric: vec![RubricCriterion {
                id: "a".to_string(),
                description: "correctness".to_string(),
                max_points: 100.0,
            }],
            assigned_student_ids: students.iter().copied().collect(),
            status: TaskStatus::Pending,
            allow_late_submissions: true,
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn ledger_with_task(task: Task) -> SubmissionLedger<MemoryStore> {
        let ledger = SubmissionLedger::new(Arc::new(MemoryStore::new()));
        ledger.register_task(task).await.unwrap();
        ledger
    }

    #[tokio::test]
    async fn identical_content_across_students_flags_plagiarism() {
        let ledger = ledger_with_task(make_task(1, &[10, 20])).await;

        ledger
            .upsert_submission(1, 10, SubmissionFields::with_content("my essay"))
            .await
            .unwrap();
        assert_eq!(ledger.task(1).await.unwrap().status, TaskStatus::Submitted);

        ledger
            .upsert_submission(1, 20, SubmissionFields::with_content("my essay"))
            .await
            .unwrap();
        assert_eq!(
            ledger.task(1).await.unwrap().status,
            TaskStatus::Plagiarized
        );

        // both submissions persist with their content
        let all = ledger.submissions(1).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|s| s.content.as_deref() == Some("my essay")));

        // durable rows match the mirror
        let stored = ledger
            .store()
            .find_submissions(&SubmissionFilter::for_task(1))
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn same_student_resubmission_is_not_flagged() {
        let ledger = ledger_with_task(make_task(1, &[10])).await;

        let first = ledger
            .upsert_submission(1, 10, SubmissionFields::with_content("draft"))
            .await
            .unwrap();
        let second = ledger
            .upsert_submission(1, 10, SubmissionFields::with_content("draft"))
            .await
            .unwrap();

        assert_eq!(ledger.task(1).await.unwrap().status, TaskStatus::Submitted);
        assert_eq!(second.id, first.id);
        assert_eq!(second.submitted_at, first.submitted_at);
        assert_eq!(ledger.submissions(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let ledger = ledger_with_task(make_task(1, &[10])).await;

        let fields = SubmissionFields {
            content: Some("answer".to_string()),
            raw_score: Some(80.0),
            scaled_score: Some(40),
            per_criterion_scores: HashMap::from([("a".to_string(), 80.0)]),
            feedback: Some("ok".to_string()),
            submitted_at: None,
        };

        ledger.upsert_submission(1, 10, fields.clone()).await.unwrap();
        let record = ledger.upsert_submission(1, 10, fields.clone()).await.unwrap();

        assert_eq!(record.content, fields.content);
        assert_eq!(record.raw_score, fields.raw_score);
        assert_eq!(record.scaled_score, fields.scaled_score);
        assert_eq!(record.per_criterion_scores, fields.per_criterion_scores);
        assert_eq!(record.feedback, fields.feedback);
        assert_eq!(ledger.submissions(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unassigned_student_is_rejected() {
        let ledger = ledger_with_task(make_task(1, &[10])).await;
        let err = ledger
            .upsert_submission(1, 99, SubmissionFields::with_content("x"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidAssignment {
                task_id: 1,
                student_id: 99
            }
        ));
        assert!(ledger.submissions(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_task_is_rejected() {
        let ledger = SubmissionLedger::new(Arc::new(MemoryStore::new()));
        let err = ledger
            .upsert_submission(5, 10, SubmissionFields::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnknownTask(5)));
    }

    #[tokio::test]
    async fn late_submissions_rejected_but_regrades_allowed() {
        // student 10 submits while the task is open
        let ledger = ledger_with_task(make_task(1, &[10, 20])).await;
        ledger
            .upsert_submission(1, 10, SubmissionFields::with_content("on time"))
            .await
            .unwrap();

        // administrative edit closes the task; re-registration hydrates the
        // existing submission from the store
        let mut closed = make_task(1, &[10, 20]);
        closed.allow_late_submissions = false;
        closed.due_date = Some(Utc::now() - Duration::hours(1));
        closed.status = TaskStatus::Submitted;
        ledger.register_task(closed).await.unwrap();

        // new submission from student 20 is late
        let err = ledger
            .upsert_submission(1, 20, SubmissionFields::with_content("too late"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::LateSubmission(1)));

        // updating student 10's existing record (a re-grade) still works
        let regraded = ledger
            .upsert_submission(
                1,
                10,
                SubmissionFields {
                    content: Some("on time".to_string()),
                    raw_score: Some(70.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(regraded.raw_score, Some(70.0));
    }

    #[tokio::test]
    async fn administrative_transitions_follow_the_table() {
        let ledger = ledger_with_task(make_task(1, &[10])).await;

        // graded only from submitted
        let err = ledger.commit_grade(1).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidTransition {
                from: TaskStatus::Pending,
                to: TaskStatus::Graded,
                ..
            }
        ));

        ledger.mark_in_progress(1).await.unwrap();
        assert_eq!(
            ledger.task(1).await.unwrap().status,
            TaskStatus::InProgress
        );

        ledger
            .upsert_submission(1, 10, SubmissionFields::with_content("done"))
            .await
            .unwrap();
        let graded = ledger.commit_grade(1).await.unwrap();
        assert_eq!(graded.status, TaskStatus::Graded);

        // in-progress only from pending
        assert!(ledger.mark_in_progress(1).await.is_err());

        // reset works from anywhere
        let reset = ledger.reset(1).await.unwrap();
        assert_eq!(reset.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn persistence_failure_leaves_memory_untouched() {
        let store = Arc::new(FailingStore::new());
        let ledger = SubmissionLedger::new(Arc::clone(&store));
        ledger.register_task(make_task(1, &[10])).await.unwrap();

        store.fail_writes(true);
        let err = ledger
            .upsert_submission(1, 10, SubmissionFields::with_content("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Persistence(_)));
        assert!(ledger.submissions(1).await.unwrap().is_empty());
        assert_eq!(ledger.task(1).await.unwrap().status, TaskStatus::Pending);

        store.fail_writes(false);
        ledger
            .upsert_submission(1, 10, SubmissionFields::with_content("x"))
            .await
            .unwrap();
        assert_eq!(ledger.task(1).await.unwrap().status, TaskStatus::Submitted);
    }

    #[tokio::test]
    async fn hash_index_follows_content_changes() {
        let ledger = ledger_with_task(make_task(1, &[10, 20])).await;

        ledger
            .upsert_submission(1, 10, SubmissionFields::with_content("first draft"))
            .await
            .unwrap();
        ledger
            .upsert_submission(1, 10, SubmissionFields::with_content("final draft"))
            .await
            .unwrap();

        // student 20 submitting student 10's *abandoned* draft is no collision
        ledger
            .upsert_submission(1, 20, SubmissionFields::with_content("first draft"))
            .await
            .unwrap();
        assert_eq!(ledger.task(1).await.unwrap().status, TaskStatus::Submitted);

        // but the current draft still is
        ledger
            .upsert_submission(1, 20, SubmissionFields::with_content("final draft"))
            .await
            .unwrap();
        assert_eq!(
            ledger.task(1).await.unwrap().status,
            TaskStatus::Plagiarized
        );
    }

    #[tokio::test]
    async fn plagiarized_is_terminal_for_automatic_transitions() {
        let ledger = ledger_with_task(make_task(1, &[10, 20, 30])).await;
        ledger
            .upsert_submission(1, 10, SubmissionFields::with_content("same"))
            .await
            .unwrap();
        ledger
            .upsert_submission(1, 20, SubmissionFields::with_content("same"))
            .await
            .unwrap();

        // a clean submission afterwards is stored but does not clear the flag
        ledger
            .upsert_submission(1, 30, SubmissionFields::with_content("original work"))
            .await
            .unwrap();
        assert_eq!(
            ledger.task(1).await.unwrap().status,
            TaskStatus::Plagiarized
        );
        assert_eq!(ledger.submissions(1).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn detect_plagiarism_matches_index() {
        let ledger = ledger_with_task(make_task(1, &[10, 20])).await;
        ledger
            .upsert_submission(1, 10, SubmissionFields::with_content("abc"))
            .await
            .unwrap();

        let hash = compute_content_hash("abc");
        assert!(ledger.detect_plagiarism(1, 20, &hash).await.unwrap());
        // the submitting student itself does not collide
        assert!(!ledger.detect_plagiarism(1, 10, &hash).await.unwrap());
        assert!(
            !ledger
                .detect_plagiarism(1, 20, &compute_content_hash("other"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn submission_without_content_has_no_hash() {
        let ledger = ledger_with_task(make_task(1, &[10])).await;
        let record = ledger
            .upsert_submission(
                1,
                10,
                SubmissionFields {
                    raw_score: Some(50.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(record.content.is_none());
        assert!(record.content_hash.is_none());
        assert_eq!(ledger.task(1).await.unwrap().status, TaskStatus::Submitted);
    }

    #[tokio::test]
    async fn concurrent_upserts_on_one_task_serialize() {
        let ledger = Arc::new(ledger_with_task(make_task(1, &[10, 20])).await);

        let a = {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move {
                ledger
                    .upsert_submission(1, 10, SubmissionFields::with_content("same text"))
                    .await
            })
        };
        let b = {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move {
                ledger
                    .upsert_submission(1, 20, SubmissionFields::with_content("same text"))
                    .await
            })
        };

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        // whichever order the writes landed in, the collision is not lost
        assert_eq!(
            ledger.task(1).await.unwrap().status,
            TaskStatus::Plagiarized
        );
        assert_eq!(ledger.submissions(1).await.unwrap().len(), 2);
    }
}
