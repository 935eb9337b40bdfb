//! Ingestion into the OrgGist knowledge base.
//!
//! Files go through a two-phase remote pipeline: Phase A stores the bytes at
//! an object-storage gateway, Phase B triggers downstream processing with the
//! returned references. Pasted text takes a single non-phased request. The
//! orchestrator owns the upload queue and applies the partial-failure policy:
//! Phase-B failure is a warning, never a rollback.

pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod queue;
pub mod types;
pub mod validate;

pub use orchestrator::{IngestionOrchestrator, SubmitOutcome};
pub use pipeline::IngestPipeline;
pub use progress::{ManualProgress, ProgressGuard, ProgressSource, SyntheticProgress};
pub use queue::UploadQueue;
pub use types::{ItemStatus, SelectedFile, SubmissionPayload, UploadItem};
pub use validate::{validate, InvalidCause};
