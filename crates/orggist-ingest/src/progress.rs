//! Injectable progress feedback for in-flight uploads.
//!
//! The storage gateway gives no transfer feedback, so the default source is a
//! synthetic bounded counter, one task per uploading item. Sources are
//! cancellable: dropping the guard stops the task, and the queue itself
//! ignores ticks for items that are no longer uploading.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::queue::UploadQueue;

/// Emits progress ticks for exactly one uploading item.
pub trait ProgressSource: Send + Sync {
    /// Start feeding progress for `item_id` into the queue. Ticks stop when
    /// the returned guard is dropped.
    fn attach(&self, item_id: Uuid, queue: UploadQueue) -> ProgressGuard;
}

/// Cancels the underlying progress task on drop.
pub struct ProgressGuard {
    task: Option<JoinHandle<()>>,
}

impl ProgressGuard {
    /// Guard with nothing to cancel (deterministic test sources).
    pub fn noop() -> Self {
        Self { task: None }
    }

    pub fn from_task(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Default source: a periodic task bumping the item by a fixed step.
///
/// The counter is bounded below 100; the queue assigns 100 only at the
/// completion transition.
#[derive(Debug, Clone)]
pub struct SyntheticProgress {
    pub period: Duration,
    pub step: u8,
}

impl Default for SyntheticProgress {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(500),
            step: 8,
        }
    }
}

impl ProgressSource for SyntheticProgress {
    fn attach(&self, item_id: Uuid, queue: UploadQueue) -> ProgressGuard {
        let period = self.period;
        let step = u16::from(self.step.max(1));
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // first tick resolves immediately
            let mut percent: u16 = 0;
            loop {
                interval.tick().await;
                percent = (percent + step).min(99);
                queue.set_progress(item_id, percent as u8);
            }
        });
        ProgressGuard::from_task(task)
    }
}

/// Deterministic source for tests: records attachments and lets the test
/// push scripted percentages instead of waiting on real timers.
#[derive(Clone, Default)]
pub struct ManualProgress {
    attached: Arc<Mutex<Vec<(Uuid, UploadQueue)>>>,
}

impl ManualProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// IDs of every item that was attached, in order.
    pub fn attached_ids(&self) -> Vec<Uuid> {
        self.attached.lock().iter().map(|(id, _)| *id).collect()
    }

    /// Push one tick to every attached item.
    pub fn tick_all(&self, percent: u8) {
        for (id, queue) in self.attached.lock().iter() {
            queue.set_progress(*id, percent);
        }
    }
}

impl ProgressSource for ManualProgress {
    fn attach(&self, item_id: Uuid, queue: UploadQueue) -> ProgressGuard {
        self.attached.lock().push((item_id, queue));
        ProgressGuard::noop()
    }
}
