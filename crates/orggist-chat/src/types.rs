//! Chat session types and the query wire format.

use orggist_core::DEFAULT_SIMILARITY_THRESHOLD;
use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A message in the chat transcript.
///
/// `content` is append-only while the message streams; once `finalized` is
/// set the message never changes again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub finalized: bool,
}

impl Message {
    /// A finished user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            finalized: true,
        }
    }

    /// An empty assistant placeholder awaiting streamed content.
    pub fn assistant_placeholder() -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            finalized: false,
        }
    }
}

/// Options sent alongside a query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QueryOptions {
    pub web_search: bool,
    pub similarity_threshold: f64,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            web_search: false,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

/// JSON body for the query endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct QueryRequest<'a> {
    pub query: &'a str,
    pub web_search: bool,
    pub similarity_threshold: f64,
}
