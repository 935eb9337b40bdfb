//! Client configuration: backend endpoints and the upload policy.

use serde::{Deserialize, Serialize};

/// Default similarity threshold sent with queries.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.3;

const DEFAULT_MAX_ITEM_SIZE: u64 = 50 * 1024 * 1024;

/// Endpoints of the OrgGist backend services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Query endpoint (`POST {query, web_search, similarity_threshold}`, chunked text back).
    pub query_url: String,
    /// Object-storage gateway (`POST multipart`, repeated `files` field).
    pub storage_upload_url: String,
    /// Processing trigger (`POST {presigned_urls, file_names}`).
    pub processing_url: String,
    /// Text ingestion (`POST {content, username}`).
    pub text_ingest_url: String,
    /// Default similarity threshold for queries.
    pub similarity_threshold: f64,
}

impl ClientConfig {
    /// Build configuration from `ORGGIST_*` environment variables with
    /// the reference deployment's defaults.
    pub fn from_env() -> Self {
        Self {
            query_url: env_or("ORGGIST_QUERY_URL", "http://127.0.0.1:8000/ask"),
            storage_upload_url: env_or("ORGGIST_UPLOAD_URL", "http://localhost:8080/upload"),
            processing_url: env_or("ORGGIST_PROCESS_URL", "http://localhost:8001/process-pdfs"),
            text_ingest_url: env_or("ORGGIST_TEXT_URL", "http://localhost:8080/code-upload"),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Upload validation policy: content-kind allow-list and size bound.
///
/// Always passed explicitly; never read from ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadPolicy {
    /// Accepted content kinds (MIME types).
    pub allowed_kinds: Vec<String>,
    /// Maximum item size in bytes.
    pub max_size_bytes: u64,
}

impl UploadPolicy {
    pub fn max_size_mb(&self) -> u64 {
        self.max_size_bytes / (1024 * 1024)
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            allowed_kinds: vec![
                "application/pdf".to_string(),
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                    .to_string(),
            ],
            max_size_bytes: DEFAULT_MAX_ITEM_SIZE,
        }
    }
}

/// Identity of the user on whose behalf requests are made.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub username: String,
}

impl UserContext {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = UploadPolicy::default();
        assert_eq!(policy.max_size_mb(), 50);
        assert!(policy.allowed_kinds.iter().any(|k| k == "application/pdf"));
    }

    #[test]
    fn test_default_threshold() {
        let config = ClientConfig::from_env();
        assert_eq!(config.similarity_threshold, 0.3);
    }
}
