//! # Submission Ledger
//!
//! This crate owns the collection of submissions per task and everything that
//! follows from it: the one-submission-per-student invariant, exact-duplicate
//! plagiarism detection, and the task status lifecycle.
//!
//! ## Key Concepts
//! - **SubmissionLedger**: per-task serialized mutation over an async record
//!   store; the in-memory state mirrors what was durably written.
//! - **Fingerprints**: SHA-256 over the raw submission text; equal fingerprints
//!   across *different* students on the same task flag a plagiarism pair.
//! - **Status ownership**: task status transitions happen here, as a side
//!   effect of submission writes or explicit administrative calls, never by
//!   callers poking the task record.

pub mod error;
pub mod fingerprint;
pub mod submission_ledger;

pub use error::LedgerError;
pub use fingerprint::compute_content_hash;
pub use submission_ledger::{SubmissionFields, SubmissionLedger};
