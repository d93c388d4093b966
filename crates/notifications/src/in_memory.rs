//! In-memory notification sink for tests/dev.

use std::sync::{Mutex, mpsc};

use thiserror::Error;
use tracing::debug;

use crate::NotificationRequest;
use crate::sink::{NotificationSink, Subscription};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InMemorySinkError {
    /// Send failed due to internal lock poisoning.
    #[error("notification sink lock poisoned")]
    Poisoned,
}

/// In-memory sink.
///
/// - No IO / no async
/// - Keeps a log of everything sent, in order
/// - Best-effort fan-out to subscribers
#[derive(Debug, Default)]
pub struct InMemoryNotificationSink {
    sent: Mutex<Vec<NotificationRequest>>,
    subscribers: Mutex<Vec<mpsc::Sender<NotificationRequest>>>,
}

impl InMemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request sent so far, oldest first.
    pub fn sent(&self) -> Vec<NotificationRequest> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl NotificationSink for InMemoryNotificationSink {
    type Error = InMemorySinkError;

    fn send(&self, request: NotificationRequest) -> Result<(), Self::Error> {
        debug!(kind = %request.kind, requisition_id = %request.requisition_id, "notification sent");

        let mut subs = self.subscribers.lock().map_err(|_| InMemorySinkError::Poisoned)?;
        // Drop any dead subscribers while sending.
        subs.retain(|tx| tx.send(request.clone()).is_ok());
        drop(subs);

        self.sent
            .lock()
            .map_err(|_| InMemorySinkError::Poisoned)?
            .push(request);
        Ok(())
    }

    fn subscribe(&self) -> Subscription<NotificationRequest> {
        let (tx, rx) = mpsc::channel();

        // A poisoned lock still yields a subscription; it just never receives.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }

        Subscription::new(rx)
    }
}
