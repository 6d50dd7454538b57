pub mod submission;
pub mod task;
