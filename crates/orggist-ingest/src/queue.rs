//! Upload queue with copy-on-write state.
//!
//! Every mutation clones the item vector, edits the clone, and swaps it in as
//! one atomic replacement. Observers hold `Arc` snapshots and never see a
//! half-applied update, even while per-item progress tasks run concurrently.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use orggist_core::UploadPolicy;

use crate::types::{ItemStatus, SelectedFile, UploadItem};
use crate::validate;

/// Progress is capped here while uploading; 100 is reserved for the
/// `Completed` transition.
const UPLOADING_PROGRESS_CAP: u8 = 99;

struct QueueInner {
    policy: UploadPolicy,
    items: RwLock<Arc<Vec<UploadItem>>>,
    /// Fingerprint of the last file selection. While armed, re-selecting a
    /// byte-identical set is a no-op, mirroring a file-input handle that does
    /// not re-fire for an unchanged value. Cleared when the queue empties.
    selection: Mutex<Option<u64>>,
}

/// Shared handle to the upload queue.
#[derive(Clone)]
pub struct UploadQueue {
    inner: Arc<QueueInner>,
}

impl UploadQueue {
    pub fn new(policy: UploadPolicy) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                policy,
                items: RwLock::new(Arc::new(Vec::new())),
                selection: Mutex::new(None),
            }),
        }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.inner.policy
    }

    /// Current snapshot of all items.
    pub fn snapshot(&self) -> Arc<Vec<UploadItem>> {
        self.inner.items.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// IDs of items still awaiting upload.
    pub fn pending_ids(&self) -> Vec<Uuid> {
        self.snapshot()
            .iter()
            .filter(|i| i.is_pending())
            .map(|i| i.id)
            .collect()
    }

    /// Validate and enqueue a file selection. Invalid items are stored as
    /// `Invalid` with their cause and never participate in any upload.
    ///
    /// Returns clones of the newly added items; returns an empty list when
    /// the selection fingerprint matches the still-armed previous one.
    pub fn select_files(&self, files: Vec<SelectedFile>) -> Vec<UploadItem> {
        if files.is_empty() {
            return Vec::new();
        }

        let fingerprint = selection_fingerprint(&files);
        let mut selection = self.inner.selection.lock();
        if *selection == Some(fingerprint) {
            debug!("Ignoring re-selection of an identical file set");
            return Vec::new();
        }
        *selection = Some(fingerprint);
        drop(selection);

        let added: Vec<UploadItem> = files
            .into_iter()
            .map(|file| {
                let (status, error) =
                    match validate::validate(&file.kind, file.size(), &self.inner.policy) {
                        Ok(()) => (ItemStatus::Pending, None),
                        Err(cause) => {
                            (ItemStatus::Invalid, Some(cause.message(&self.inner.policy)))
                        }
                    };
                UploadItem {
                    id: Uuid::new_v4(),
                    name: file.name,
                    kind: file.kind,
                    size: file.bytes.len() as u64,
                    bytes: file.bytes,
                    status,
                    progress: 0,
                    error,
                }
            })
            .collect();

        let result = added.clone();
        self.mutate(|items| items.extend(added));
        result
    }

    /// Remove an item at any status. Emptying the queue disarms the selection
    /// fingerprint so an identical reselect becomes observable again.
    pub fn remove(&self, id: Uuid) -> bool {
        let mut removed = false;
        self.mutate(|items| {
            let before = items.len();
            items.retain(|i| i.id != id);
            removed = items.len() < before;
        });
        if removed && self.is_empty() {
            *self.inner.selection.lock() = None;
        }
        removed
    }

    /// Move every pending item to `Uploading` in one atomic snapshot swap and
    /// return the batch. No observer sees a mix of pending and uploading.
    pub fn begin_upload(&self) -> Vec<UploadItem> {
        let mut batch = Vec::new();
        self.mutate(|items| {
            for item in items.iter_mut() {
                if item.status == ItemStatus::Pending {
                    item.status = ItemStatus::Uploading;
                    batch.push(item.clone());
                }
            }
        });
        batch
    }

    /// Record a progress tick for one item. Only `Uploading` items accept
    /// ticks, progress never decreases, and it stays below 100 until the
    /// completion transition — a late tick from a settled or removed item's
    /// timer therefore changes nothing.
    pub fn set_progress(&self, id: Uuid, percent: u8) {
        self.mutate(|items| {
            if let Some(item) = items.iter_mut().find(|i| i.id == id) {
                if item.status == ItemStatus::Uploading {
                    item.progress = percent.min(UPLOADING_PROGRESS_CAP).max(item.progress);
                }
            }
        });
    }

    /// Mark the whole uploading batch completed at exactly 100%.
    pub fn complete_uploading(&self) {
        self.mutate(|items| {
            for item in items.iter_mut() {
                if item.status == ItemStatus::Uploading {
                    item.status = ItemStatus::Completed;
                    item.progress = 100;
                    item.error = None;
                }
            }
        });
    }

    /// Fail the whole uploading batch with one uniform reason. Progress
    /// freezes at its current value.
    pub fn fail_uploading(&self, reason: &str) {
        self.mutate(|items| {
            for item in items.iter_mut() {
                if item.status == ItemStatus::Uploading {
                    item.status = ItemStatus::Failed;
                    item.error = Some(reason.to_string());
                }
            }
        });
    }

    fn mutate(&self, edit: impl FnOnce(&mut Vec<UploadItem>)) {
        let mut guard = self.inner.items.write();
        let mut items = (**guard).clone();
        edit(&mut items);
        *guard = Arc::new(items);
    }
}

fn selection_fingerprint(files: &[SelectedFile]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for file in files {
        file.name.hash(&mut hasher);
        file.bytes.len().hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: usize = 1024 * 1024;

    fn pdf(name: &str, size: usize) -> SelectedFile {
        SelectedFile::new(name, "application/pdf", vec![0u8; size])
    }

    #[test]
    fn test_selection_scenario_valid_and_too_large() {
        let queue = UploadQueue::new(UploadPolicy::default());
        let added = queue.select_files(vec![pdf("small.pdf", 10 * MB), pdf("big.pdf", 60 * MB)]);
        assert_eq!(added.len(), 2);

        let items = queue.snapshot();
        assert_eq!(items[0].status, ItemStatus::Pending);
        assert_eq!(items[1].status, ItemStatus::Invalid);
        assert_eq!(items[1].error.as_deref(), Some("File too large (max 50MB)"));

        // Only the valid item participates in the batch.
        let batch = queue.begin_upload();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].name, "small.pdf");
        let items = queue.snapshot();
        assert_eq!(items[1].status, ItemStatus::Invalid);
    }

    #[test]
    fn test_batch_transition_is_all_or_nothing() {
        let queue = UploadQueue::new(UploadPolicy::default());
        queue.select_files(vec![pdf("a.pdf", 1024), pdf("b.pdf", 2048)]);
        queue.begin_upload();

        let items = queue.snapshot();
        assert!(items.iter().all(|i| i.status == ItemStatus::Uploading));
        assert!(queue.pending_ids().is_empty());
    }

    #[test]
    fn test_progress_monotonic_and_capped() {
        let queue = UploadQueue::new(UploadPolicy::default());
        let added = queue.select_files(vec![pdf("a.pdf", 1024)]);
        let id = added[0].id;
        queue.begin_upload();

        queue.set_progress(id, 50);
        assert_eq!(queue.snapshot()[0].progress, 50);

        // Regressions are ignored.
        queue.set_progress(id, 30);
        assert_eq!(queue.snapshot()[0].progress, 50);

        // 100 is reserved for completion.
        queue.set_progress(id, 100);
        assert_eq!(queue.snapshot()[0].progress, 99);

        queue.complete_uploading();
        let item = &queue.snapshot()[0];
        assert_eq!(item.status, ItemStatus::Completed);
        assert_eq!(item.progress, 100);
    }

    #[test]
    fn test_progress_frozen_after_status_settles() {
        let queue = UploadQueue::new(UploadPolicy::default());
        let added = queue.select_files(vec![pdf("a.pdf", 1024)]);
        let id = added[0].id;
        queue.begin_upload();
        queue.set_progress(id, 40);
        queue.fail_uploading("Upload failed");

        // A straggler tick must not move a settled item.
        queue.set_progress(id, 90);
        let item = &queue.snapshot()[0];
        assert_eq!(item.status, ItemStatus::Failed);
        assert_eq!(item.progress, 40);
    }

    #[test]
    fn test_tick_for_removed_item_is_ignored() {
        let queue = UploadQueue::new(UploadPolicy::default());
        let added = queue.select_files(vec![pdf("a.pdf", 1024)]);
        let id = added[0].id;
        queue.begin_upload();
        assert!(queue.remove(id));

        queue.set_progress(id, 75);
        assert!(queue.snapshot().is_empty());
    }

    #[test]
    fn test_identical_reselect_is_noop_until_queue_empties() {
        let queue = UploadQueue::new(UploadPolicy::default());
        let files = || vec![pdf("a.pdf", 1024)];

        let first = queue.select_files(files());
        assert_eq!(first.len(), 1);

        // Same set again while the selection is armed: nothing happens.
        assert!(queue.select_files(files()).is_empty());
        assert_eq!(queue.snapshot().len(), 1);

        // Removing the last item disarms the selection handle.
        assert!(queue.remove(first[0].id));
        let again = queue.select_files(files());
        assert_eq!(again.len(), 1);
        assert_eq!(queue.snapshot().len(), 1);
    }

    #[test]
    fn test_different_selection_appends() {
        let queue = UploadQueue::new(UploadPolicy::default());
        queue.select_files(vec![pdf("a.pdf", 1024)]);
        queue.select_files(vec![pdf("b.pdf", 1024)]);
        assert_eq!(queue.snapshot().len(), 2);
    }

    #[test]
    fn test_remove_at_any_status() {
        let queue = UploadQueue::new(UploadPolicy::default());
        let added = queue.select_files(vec![
            pdf("a.pdf", 1024),
            SelectedFile::new("x.png", "image/png", vec![0u8; 16]),
        ]);
        // Invalid items can be removed too; that is their only remedy.
        assert!(queue.remove(added[1].id));
        assert_eq!(queue.snapshot().len(), 1);
    }
}
