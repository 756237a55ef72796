use async_trait::async_trait;
use realtydesk_services::notify::{CaseEmail, CaseNotifier, NotifyError};
use std::sync::Mutex;
use std::time::Duration;

/// Keeps every email instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<CaseEmail>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<CaseEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Polls until at least `count` emails were recorded or `timeout` passes.
    /// Delivery runs on a detached task, so tests have to wait for it.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<CaseEmail> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let sent = self.sent();
            if sent.len() >= count || tokio::time::Instant::now() >= deadline {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }
}

#[async_trait]
impl CaseNotifier for RecordingNotifier {
    async fn send(&self, email: CaseEmail) -> Result<(), NotifyError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email);
        }
        Ok(())
    }
}

/// Always fails, to prove notifier errors never reach the caller.
pub struct FailingNotifier;

#[async_trait]
impl CaseNotifier for FailingNotifier {
    async fn send(&self, _email: CaseEmail) -> Result<(), NotifyError> {
        Err(NotifyError::Rejected("mail relay unavailable".to_string()))
    }
}
