//! The remote ingestion calls: two-phase for files, single for text.
//!
//! Phase A stores bytes at the object-storage gateway and returns one
//! pre-signed reference per file, order-correlated with the inputs. Phase B
//! hands those references to the processing service. There is deliberately no
//! compensation step: once Phase A succeeds the bytes stay stored even if
//! Phase B fails.

use reqwest::{Client, StatusCode};
use serde_json::json;
use tracing::debug;

use orggist_core::{ClientConfig, Error, Result, UserContext};

use crate::types::UploadItem;

pub struct IngestPipeline {
    client: Client,
    config: ClientConfig,
}

impl IngestPipeline {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: ClientConfig) -> Self {
        Self { client, config }
    }

    /// Phase A: one batched multipart request with a repeated `files` field.
    ///
    /// A 413 is the distinguished "too large" case; any other non-2xx is a
    /// generic server failure. Success returns the pre-signed references in
    /// input order.
    pub async fn store_files(&self, items: &[UploadItem]) -> Result<Vec<String>> {
        let mut form = reqwest::multipart::Form::new();
        for item in items {
            let part = reqwest::multipart::Part::bytes((*item.bytes).clone())
                .file_name(item.name.clone())
                .mime_str(&item.kind)
                .map_err(|e| Error::Config(format!("invalid content kind: {}", e)))?;
            form = form.part("files", part);
        }

        debug!(
            "Phase A: storing {} files via {}",
            items.len(),
            self.config.storage_upload_url
        );

        let response = self
            .client
            .post(&self.config.storage_upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                let urls: Vec<String> = response
                    .json()
                    .await
                    .map_err(|e| Error::Stream(format!("malformed storage response: {}", e)))?;
                if urls.len() != items.len() {
                    return Err(Error::Stream(format!(
                        "storage returned {} references for {} files",
                        urls.len(),
                        items.len()
                    )));
                }
                Ok(urls)
            }
            StatusCode::PAYLOAD_TOO_LARGE => Err(Error::PayloadTooLarge),
            status => Err(Error::Server {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    /// Phase B: hand the stored references to the processing service.
    pub async fn trigger_processing(&self, presigned_urls: &[String], file_names: &[String]) -> Result<()> {
        debug!(
            "Phase B: triggering processing for {} files",
            file_names.len()
        );

        let response = self
            .client
            .post(&self.config.processing_url)
            .json(&json!({
                "presigned_urls": presigned_urls,
                "file_names": file_names,
            }))
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Server { status, body });
        }
        Ok(())
    }

    /// Text mode: a single non-phased request with the pasted content.
    /// Failure detail is taken from the response body text.
    pub async fn ingest_text(&self, content: &str, user: &UserContext) -> Result<()> {
        let response = self
            .client
            .post(&self.config.text_ingest_url)
            .json(&json!({
                "content": content,
                "username": user.username,
            }))
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Server { status, body });
        }
        Ok(())
    }
}
