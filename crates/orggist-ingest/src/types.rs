//! Upload queue types.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of one upload item.
///
/// `Pending → Uploading → Completed | Failed`; `Invalid` is assigned only at
/// selection-time validation and is terminal. No other transitions exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Uploading,
    Completed,
    Failed,
    Invalid,
}

/// A file the user picked for upload, before validation.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    /// Content kind (MIME type).
    pub kind: String,
    pub bytes: Arc<Vec<u8>>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            bytes: Arc::new(bytes),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// One item in the upload queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    pub id: Uuid,
    pub name: String,
    /// Content kind (MIME type).
    pub kind: String,
    pub size: u64,
    pub bytes: Arc<Vec<u8>>,
    pub status: ItemStatus,
    /// Upload progress percent. Non-decreasing; capped below 100 while
    /// uploading and set to exactly 100 at the `Completed` transition.
    pub progress: u8,
    pub error: Option<String>,
}

impl UploadItem {
    pub fn is_pending(&self) -> bool {
        self.status == ItemStatus::Pending
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            ItemStatus::Completed | ItemStatus::Failed | ItemStatus::Invalid
        )
    }
}

/// What one submission carries. File items and pasted text are mutually
/// exclusive by construction; the invalid "both set" state cannot be
/// represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionPayload {
    /// IDs of the pending file items to upload.
    Files(Vec<Uuid>),
    /// The pasted text blob.
    Text(String),
}
