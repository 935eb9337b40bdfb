//! Streaming query consumption for the OrgGist answer endpoint.
//!
//! The backend streams raw UTF-8 text in chunks. The consumer accumulates
//! decoded text and republishes the full message list after every chunk, so
//! renderers always re-render complete content rather than deltas.

pub mod consumer;
pub mod decode;
pub mod types;

pub use consumer::{QueryStreamConsumer, STREAM_ERROR_TEXT};
pub use decode::Utf8Accumulator;
pub use types::{Message, QueryOptions, Role};
