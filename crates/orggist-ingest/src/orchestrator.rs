//! Ingestion orchestrator — owns the upload queue and drives the pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use orggist_core::{
    ClientConfig, Error, Notification, Notifier, Result, TracingNotifier, UploadPolicy,
    UserContext,
};

use crate::pipeline::IngestPipeline;
use crate::progress::{ProgressGuard, ProgressSource, SyntheticProgress};
use crate::queue::UploadQueue;
use crate::types::{SubmissionPayload, UploadItem};

/// How a submission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Files stored and processing triggered.
    FilesProcessed { count: usize },
    /// Files stored durably, but the processing trigger failed — search over
    /// them may be degraded. Not rolled back.
    FilesStoredProcessingDegraded { count: usize },
    /// Pasted text ingested.
    TextIngested,
}

/// Drives the two-phase ingestion pipeline over the upload queue.
///
/// Enforces the file/text mutual exclusion before any network call and
/// applies the partial-failure policy: a Phase-A failure fails the whole
/// batch uniformly, a Phase-B failure degrades to a single warning while the
/// stored items stay completed.
pub struct IngestionOrchestrator {
    queue: UploadQueue,
    pipeline: IngestPipeline,
    progress: Arc<dyn ProgressSource>,
    notifier: Arc<dyn Notifier>,
    user: UserContext,
    text: RwLock<String>,
    busy: AtomicBool,
}

impl IngestionOrchestrator {
    pub fn new(config: ClientConfig, policy: UploadPolicy, user: UserContext) -> Self {
        Self::with_parts(
            UploadQueue::new(policy),
            IngestPipeline::new(config),
            Arc::new(SyntheticProgress::default()),
            Arc::new(TracingNotifier),
            user,
        )
    }

    /// Assemble from explicit parts (tests inject a deterministic progress
    /// source and a recording notifier here).
    pub fn with_parts(
        queue: UploadQueue,
        pipeline: IngestPipeline,
        progress: Arc<dyn ProgressSource>,
        notifier: Arc<dyn Notifier>,
        user: UserContext,
    ) -> Self {
        Self {
            queue,
            pipeline,
            progress,
            notifier,
            user,
            text: RwLock::new(String::new()),
            busy: AtomicBool::new(false),
        }
    }

    pub fn queue(&self) -> &UploadQueue {
        &self.queue
    }

    /// Validate and enqueue a file selection, notifying for each rejected
    /// item. Rejected items stay in the queue as `Invalid` until removed.
    pub fn select_files(&self, files: Vec<crate::types::SelectedFile>) -> Vec<UploadItem> {
        let added = self.queue.select_files(files);
        for item in &added {
            if let Some(error) = &item.error {
                self.notifier
                    .notify(Notification::error(format!("{}: {}", item.name, error)));
            }
        }
        added
    }

    /// Replace the pasted-text buffer.
    pub fn set_text(&self, text: impl Into<String>) {
        *self.text.write() = text.into();
    }

    pub fn text(&self) -> String {
        self.text.read().clone()
    }

    /// Submit whatever the queue holds: pending files or the text blob.
    ///
    /// Mixed or empty state is rejected before any network call. Only one
    /// submission may be in flight at a time.
    pub async fn submit_queue(&self) -> Result<SubmitOutcome> {
        if self.busy.swap(true, Ordering::SeqCst) {
            self.notifier
                .notify(Notification::info("Files are still uploading. Please wait."));
            return Err(Error::Busy);
        }
        let result = self.drive().await;
        self.busy.store(false, Ordering::SeqCst);
        result
    }

    async fn drive(&self) -> Result<SubmitOutcome> {
        let payload = match self.payload() {
            Ok(payload) => payload,
            Err(e) => {
                self.notifier.notify(Notification::error(e.to_string()));
                return Err(e);
            }
        };

        match payload {
            SubmissionPayload::Files(_) => self.submit_files().await,
            SubmissionPayload::Text(content) => self.submit_text(&content).await,
        }
    }

    /// Compute the submission payload as a sum type: pending files XOR text.
    fn payload(&self) -> Result<SubmissionPayload> {
        let pending = self.queue.pending_ids();
        let text = self.text.read().trim().to_string();
        match (pending.is_empty(), text.is_empty()) {
            (false, false) => Err(Error::MixedSubmission),
            (true, true) => Err(Error::EmptySubmission),
            (false, true) => Ok(SubmissionPayload::Files(pending)),
            (true, false) => Ok(SubmissionPayload::Text(text)),
        }
    }

    async fn submit_files(&self) -> Result<SubmitOutcome> {
        let batch = self.queue.begin_upload();
        let guards: Vec<ProgressGuard> = batch
            .iter()
            .map(|item| self.progress.attach(item.id, self.queue.clone()))
            .collect();

        // Phase A: all-or-nothing durable storage.
        let urls = match self.pipeline.store_files(&batch).await {
            Ok(urls) => urls,
            Err(e) => {
                self.queue.fail_uploading("Upload failed");
                drop(guards);
                let message = match &e {
                    Error::PayloadTooLarge => {
                        "File upload failed: file size too large for server."
                    }
                    _ => "File upload failed.",
                };
                self.notifier.notify(Notification::error(message));
                return Err(e);
            }
        };

        // The bytes are durably stored; complete the batch before Phase B so
        // a processing failure cannot roll it back.
        self.queue.complete_uploading();
        drop(guards);
        info!("Phase A complete: {} files stored", batch.len());

        let names: Vec<String> = batch.iter().map(|i| i.name.clone()).collect();
        match self.pipeline.trigger_processing(&urls, &names).await {
            Ok(()) => {
                self.notifier.notify(Notification::success(
                    "Files uploaded and processed successfully!",
                ));
                Ok(SubmitOutcome::FilesProcessed { count: batch.len() })
            }
            Err(e) => {
                warn!("Processing trigger failed after storage succeeded: {}", e);
                self.notifier.notify(Notification::warning(
                    "Files uploaded but processing failed. \
                     You may not be able to search through these files.",
                ));
                Ok(SubmitOutcome::FilesStoredProcessingDegraded { count: batch.len() })
            }
        }
    }

    async fn submit_text(&self, content: &str) -> Result<SubmitOutcome> {
        match self.pipeline.ingest_text(content, &self.user).await {
            Ok(()) => {
                self.notifier
                    .notify(Notification::success("Text uploaded successfully."));
                Ok(SubmitOutcome::TextIngested)
            }
            Err(e) => {
                let detail = match &e {
                    Error::Server { body, .. } => body.clone(),
                    other => other.to_string(),
                };
                self.notifier
                    .notify(Notification::error(format!("Failed to upload text: {}", detail)));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ManualProgress;
    use crate::types::{ItemStatus, SelectedFile};
    use orggist_core::{NotifyLevel, RecordingNotifier};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Harness {
        orchestrator: Arc<IngestionOrchestrator>,
        notifier: Arc<RecordingNotifier>,
        progress: ManualProgress,
    }

    fn harness(server_uri: &str) -> Harness {
        let config = ClientConfig {
            query_url: format!("{}/ask", server_uri),
            storage_upload_url: format!("{}/upload", server_uri),
            processing_url: format!("{}/process-pdfs", server_uri),
            text_ingest_url: format!("{}/code-upload", server_uri),
            similarity_threshold: 0.3,
        };
        let notifier = Arc::new(RecordingNotifier::new());
        let progress = ManualProgress::new();
        let orchestrator = Arc::new(IngestionOrchestrator::with_parts(
            UploadQueue::new(UploadPolicy::default()),
            IngestPipeline::new(config),
            Arc::new(progress.clone()),
            notifier.clone(),
            UserContext::new("Test User"),
        ));
        Harness {
            orchestrator,
            notifier,
            progress,
        }
    }

    fn pdf(name: &str) -> SelectedFile {
        SelectedFile::new(name, "application/pdf", vec![0u8; 256])
    }

    async fn mount_phase_a_ok(server: &MockServer, urls: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(urls))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_mixed_submission_rejected_with_zero_network_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/code-upload"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        h.orchestrator.select_files(vec![pdf("a.pdf")]);
        h.orchestrator.set_text("also some pasted text");

        let err = h.orchestrator.submit_queue().await.unwrap_err();
        assert!(matches!(err, Error::MixedSubmission));
        assert_eq!(h.notifier.count(NotifyLevel::Error), 1);

        // Nothing moved out of pending.
        let items = h.orchestrator.queue().snapshot();
        assert!(items.iter().all(|i| i.status == ItemStatus::Pending));
    }

    #[tokio::test]
    async fn test_empty_submission_rejected() {
        let server = MockServer::start().await;
        let h = harness(&server.uri());
        let err = h.orchestrator.submit_queue().await.unwrap_err();
        assert!(matches!(err, Error::EmptySubmission));
        assert_eq!(h.notifier.count(NotifyLevel::Error), 1);
    }

    #[tokio::test]
    async fn test_full_pipeline_success() {
        let server = MockServer::start().await;
        mount_phase_a_ok(&server, json!(["https://s3/a", "https://s3/b"])).await;
        Mock::given(method("POST"))
            .and(path("/process-pdfs"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        h.orchestrator.select_files(vec![pdf("a.pdf"), pdf("b.pdf")]);

        let outcome = h.orchestrator.submit_queue().await.unwrap();
        assert_eq!(outcome, SubmitOutcome::FilesProcessed { count: 2 });

        let items = h.orchestrator.queue().snapshot();
        assert!(items
            .iter()
            .all(|i| i.status == ItemStatus::Completed && i.progress == 100));
        assert_eq!(h.notifier.count(NotifyLevel::Success), 1);
        // A progress source was attached for each batch item.
        assert_eq!(h.progress.attached_ids().len(), 2);
    }

    #[tokio::test]
    async fn test_partial_failure_policy_phase_b_is_soft() {
        let server = MockServer::start().await;
        mount_phase_a_ok(&server, json!(["https://s3/a", "https://s3/b", "https://s3/c"])).await;
        Mock::given(method("POST"))
            .and(path("/process-pdfs"))
            .respond_with(ResponseTemplate::new(500).set_body_string("worker crashed"))
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        h.orchestrator
            .select_files(vec![pdf("a.pdf"), pdf("b.pdf"), pdf("c.pdf")]);

        let outcome = h.orchestrator.submit_queue().await.unwrap();
        assert_eq!(outcome, SubmitOutcome::FilesStoredProcessingDegraded { count: 3 });

        // All stored items end completed; none failed; exactly one warning.
        let items = h.orchestrator.queue().snapshot();
        assert_eq!(
            items
                .iter()
                .filter(|i| i.status == ItemStatus::Completed)
                .count(),
            3
        );
        assert!(!items.iter().any(|i| i.status == ItemStatus::Failed));
        assert_eq!(h.notifier.count(NotifyLevel::Warning), 1);
        assert_eq!(h.notifier.count(NotifyLevel::Error), 0);
    }

    #[tokio::test]
    async fn test_phase_a_failure_is_all_or_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/process-pdfs"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        h.orchestrator.select_files(vec![pdf("a.pdf"), pdf("b.pdf")]);

        let err = h.orchestrator.submit_queue().await.unwrap_err();
        assert!(matches!(err, Error::Server { status: 500, .. }));

        let items = h.orchestrator.queue().snapshot();
        assert!(items.iter().all(|i| {
            i.status == ItemStatus::Failed && i.error.as_deref() == Some("Upload failed")
        }));
        assert_eq!(h.notifier.count(NotifyLevel::Error), 1);
    }

    #[tokio::test]
    async fn test_phase_a_413_reports_too_large() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(413))
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        h.orchestrator.select_files(vec![pdf("a.pdf")]);

        let err = h.orchestrator.submit_queue().await.unwrap_err();
        assert!(matches!(err, Error::PayloadTooLarge));

        let recorded = h.notifier.recorded();
        assert!(recorded
            .iter()
            .any(|n| n.message.contains("file size too large for server")));
    }

    #[tokio::test]
    async fn test_invalid_items_never_reach_the_pipeline() {
        let server = MockServer::start().await;
        mount_phase_a_ok(&server, json!(["https://s3/a"])).await;
        Mock::given(method("POST"))
            .and(path("/process-pdfs"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        h.orchestrator.select_files(vec![
            pdf("good.pdf"),
            SelectedFile::new("bad.png", "image/png", vec![0u8; 16]),
        ]);
        // The rejected item produced a selection-time notification.
        assert_eq!(h.notifier.count(NotifyLevel::Error), 1);

        h.orchestrator.submit_queue().await.unwrap();

        let items = h.orchestrator.queue().snapshot();
        assert_eq!(items[0].status, ItemStatus::Completed);
        assert_eq!(items[1].status, ItemStatus::Invalid);

        // A later submit finds nothing pending and still leaves it invalid.
        let err = h.orchestrator.submit_queue().await.unwrap_err();
        assert!(matches!(err, Error::EmptySubmission));
        assert_eq!(
            h.orchestrator.queue().snapshot()[1].status,
            ItemStatus::Invalid
        );
    }

    #[tokio::test]
    async fn test_text_mode_success_and_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/code-upload"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        h.orchestrator.set_text("fn main() {}");
        let outcome = h.orchestrator.submit_queue().await.unwrap();
        assert_eq!(outcome, SubmitOutcome::TextIngested);
        assert_eq!(h.notifier.count(NotifyLevel::Success), 1);
        // No queue items were involved.
        assert!(h.orchestrator.queue().is_empty());

        server.reset().await;
        Mock::given(method("POST"))
            .and(path("/code-upload"))
            .respond_with(ResponseTemplate::new(500).set_body_string("db unavailable"))
            .mount(&server)
            .await;

        let err = h.orchestrator.submit_queue().await.unwrap_err();
        assert!(matches!(err, Error::Server { status: 500, .. }));
        let recorded = h.notifier.recorded();
        assert!(recorded
            .iter()
            .any(|n| n.message == "Failed to upload text: db unavailable"));
    }

    #[tokio::test]
    async fn test_overlapping_submission_rejected_busy() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!(["https://s3/a"]))
                    .set_delay(Duration::from_millis(250)),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/process-pdfs"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        h.orchestrator.select_files(vec![pdf("a.pdf")]);

        let background = {
            let orchestrator = h.orchestrator.clone();
            tokio::spawn(async move { orchestrator.submit_queue().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = h.orchestrator.submit_queue().await.unwrap_err();
        assert!(matches!(err, Error::Busy));

        background.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_manual_progress_drives_items_monotonically() {
        let server = MockServer::start().await;
        mount_phase_a_ok(&server, json!(["https://s3/a"])).await;
        Mock::given(method("POST"))
            .and(path("/process-pdfs"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let h = harness(&server.uri());
        h.orchestrator.select_files(vec![pdf("a.pdf")]);
        h.orchestrator.submit_queue().await.unwrap();

        // Progress was frozen at 100 on completion; a late tick is inert.
        h.progress.tick_all(10);
        let item = &h.orchestrator.queue().snapshot()[0];
        assert_eq!(item.progress, 100);
        assert_eq!(item.status, ItemStatus::Completed);
    }
}
