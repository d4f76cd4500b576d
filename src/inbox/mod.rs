//! Message-to-file materialization.
//!
//! A relay batch flows through:
//! 1. `AdmissionFilter` — sender/group whitelist
//! 2. `NoteWriter` or `AttachmentResolver` — one task per note or attachment
//! 3. `SummaryBuilder` — what was created, what was appended to
//!
//! Files in the inbox are never truncated. Failures land in the run's
//! `ErrorLog` and never abort the batch.

pub mod admission;
pub mod attachments;
pub mod error_log;
pub mod files;
pub mod naming;
pub mod notes;
pub mod processor;
pub mod summary;

pub use admission::AdmissionFilter;
pub use attachments::AttachmentResolver;
pub use error_log::ErrorLog;
pub use naming::NamingPolicy;
pub use notes::NoteWriter;
pub use processor::InboxProcessor;
pub use summary::{FileWrite, RunSummary};
