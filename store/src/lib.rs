//! Record store abstraction for the grading core.
//!
//! Domain records (tasks, submissions) plus the [`RecordStore`] trait the rest
//! of the workspace persists through. The hosted database behind the real
//! deployment is swappable; [`MemoryStore`] is the in-process implementation
//! used by tests and embedded setups.

pub mod error;
pub mod memory;
pub mod models;
pub mod record_store;
pub mod test_utils;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use models::submission::Submission;
pub use models::task::{RubricCriterion, Task, TaskStatus};
pub use record_store::{RecordStore, SubmissionFilter};
