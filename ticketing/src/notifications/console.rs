//! Notifiers that never leave the process.

use super::{ConfirmationMessage, NotificationError, Notifier};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

/// Writes confirmations to the log (development).
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    /// Create a new console notifier
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Notifier for ConsoleNotifier {
    fn send<'a>(
        &'a self,
        message: &'a ConfirmationMessage,
    ) -> BoxFuture<'a, Result<(), NotificationError>> {
        Box::pin(async move {
            info!(
                "\n\n\
                ┌────────────────────────────────────────────────────────────────┐\n\
                │                    Ticket Confirmation                         │\n\
                ├────────────────────────────────────────────────────────────────┤\n\
                │ To: {:<58} │\n\
                │ Subject: {:<53} │\n\
                └────────────────────────────────────────────────────────────────┘\n\
                {}",
                message.to, message.subject, message.body
            );
            Ok(())
        })
    }
}

/// Keeps every message in memory; can be switched to fail or slowed down.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<ConfirmationMessage>>>,
    failing: Arc<AtomicBool>,
    delay: Duration,
}

impl RecordingNotifier {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait `delay` before every send, like a slow provider.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make subsequent sends fail.
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Messages delivered so far
    pub async fn sent(&self) -> Vec<ConfirmationMessage> {
        self.sent.lock().await.clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send<'a>(
        &'a self,
        message: &'a ConfirmationMessage,
    ) -> BoxFuture<'a, Result<(), NotificationError>> {
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(NotificationError::Transport("injected failure".to_string()));
            }
            self.sent.lock().await.push(message.clone());
            Ok(())
        })
    }
}
