//! OrgGist Core — error taxonomy, client configuration, notifications.

pub mod config;
pub mod error;
pub mod notify;

pub use config::{ClientConfig, UploadPolicy, UserContext, DEFAULT_SIMILARITY_THRESHOLD};
pub use error::{Error, Result};
pub use notify::{Notification, Notifier, NotifyLevel, RecordingNotifier, TracingNotifier};
