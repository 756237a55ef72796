//! Outbound email about case lifecycle events.

pub mod email;
pub mod template;

use async_trait::async_trait;
use thiserror::Error;

pub use email::EmailNotifier;

/// Shown when a case has no resolvable property.
pub const UNKNOWN_PROPERTY: &str = "Unknown Property";

#[derive(Debug, Clone, PartialEq)]
pub struct CaseEmail {
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Notifier rejected the message: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait CaseNotifier: Send + Sync {
    async fn send(&self, email: CaseEmail) -> Result<(), NotifyError>;
}
