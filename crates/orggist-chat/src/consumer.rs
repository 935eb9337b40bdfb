//! Query stream consumer — issues a query and streams the answer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use reqwest::Client;
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use orggist_core::{ClientConfig, Error, Result};

use crate::decode::Utf8Accumulator;
use crate::types::{Message, QueryOptions, QueryRequest, Role};

/// Fixed user-facing text for a failed answer stream.
pub const STREAM_ERROR_TEXT: &str = "⚠️ Sorry, something went wrong.";

/// Consumes the chunked answer stream for one chat session.
///
/// Owns the message transcript exclusively. At most one request streams at a
/// time; overlapping submissions are rejected with [`Error::Busy`]. Every
/// mutation replaces the whole transcript snapshot, so observers never see a
/// partially applied update.
pub struct QueryStreamConsumer {
    client: Client,
    config: ClientConfig,
    state: RwLock<Arc<Vec<Message>>>,
    updates: watch::Sender<Arc<Vec<Message>>>,
    busy: AtomicBool,
    cancel: Mutex<CancellationToken>,
}

impl QueryStreamConsumer {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: ClientConfig) -> Self {
        let snapshot: Arc<Vec<Message>> = Arc::new(Vec::new());
        let (updates, _) = watch::channel(snapshot.clone());
        Self {
            client,
            config,
            state: RwLock::new(snapshot),
            updates,
            busy: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Current transcript snapshot.
    pub fn messages(&self) -> Arc<Vec<Message>> {
        self.state.read().clone()
    }

    /// Subscribe to transcript snapshots; a new value arrives after every
    /// decoded chunk and carries the full accumulated content.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Message>>> {
        self.updates.subscribe()
    }

    /// Submit a query and consume the chunked answer until stream end.
    ///
    /// Appends the user message and an empty assistant placeholder, then
    /// streams decoded text into the placeholder. On any transport or status
    /// failure the placeholder is overwritten with [`STREAM_ERROR_TEXT`] and
    /// finalized; no message is ever left indefinitely non-finalized.
    pub async fn submit(&self, query: &str, options: QueryOptions) -> Result<()> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(Error::Busy);
        }

        let cancel = CancellationToken::new();
        *self.cancel.lock() = cancel.clone();

        self.mutate(|messages| {
            messages.push(Message::user(query));
            messages.push(Message::assistant_placeholder());
        });

        let result = self.consume(query, options, cancel).await;
        if let Err(e) = &result {
            warn!("Answer stream failed: {}", e);
            self.overwrite_streaming(STREAM_ERROR_TEXT);
        }
        self.finalize_streaming();
        self.busy.store(false, Ordering::SeqCst);
        result
    }

    /// Abort the in-flight stream, if any. Idempotent: safe to call before,
    /// during, or after completion; no content update follows the call.
    pub fn abort(&self) {
        self.cancel.lock().cancel();
    }

    async fn consume(
        &self,
        query: &str,
        options: QueryOptions,
        cancel: CancellationToken,
    ) -> Result<()> {
        let body = QueryRequest {
            query,
            web_search: options.web_search,
            similarity_threshold: options.similarity_threshold,
        };

        debug!("Submitting query to {}", self.config.query_url);

        let request = self.client.post(&self.config.query_url).json(&body).send();
        let response = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            r = request => r.map_err(|e| Error::Transport(e.to_string()))?,
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Server { status, body });
        }

        let mut stream = response.bytes_stream();
        let mut decoder = Utf8Accumulator::new();
        let mut accumulated = String::new();

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                chunk = stream.next() => chunk,
            };
            match next {
                Some(Ok(bytes)) => {
                    let text = decoder.push(&bytes);
                    if !text.is_empty() {
                        accumulated.push_str(&text);
                        self.overwrite_streaming(&accumulated);
                    }
                }
                Some(Err(e)) => return Err(Error::Stream(e.to_string())),
                None => break,
            }
        }

        let tail = decoder.finish();
        if !tail.is_empty() {
            accumulated.push_str(&tail);
            self.overwrite_streaming(&accumulated);
        }
        Ok(())
    }

    /// Replace the streaming assistant message's content with the full
    /// accumulated text. No-op once the message is finalized.
    fn overwrite_streaming(&self, content: &str) {
        self.mutate(|messages| {
            if let Some(last) = messages.last_mut() {
                if last.role == Role::Assistant && !last.finalized {
                    last.content = content.to_string();
                }
            }
        });
    }

    /// Mark the streaming assistant message finalized, keeping its content.
    fn finalize_streaming(&self) {
        self.mutate(|messages| {
            if let Some(last) = messages.last_mut() {
                if last.role == Role::Assistant && !last.finalized {
                    last.finalized = true;
                }
            }
        });
    }

    /// Copy-on-write transcript update: clone, edit, swap, publish.
    fn mutate(&self, edit: impl FnOnce(&mut Vec<Message>)) {
        let mut guard = self.state.write();
        let mut messages = (**guard).clone();
        edit(&mut messages);
        let snapshot = Arc::new(messages);
        *guard = snapshot.clone();
        drop(guard);
        // send_replace stores the snapshot even when no renderer is subscribed.
        self.updates.send_replace(snapshot);
    }
}
