//! Notification delivery abstraction (mechanics only).
//!
//! Sinks are fire-and-forget from the workflow's point of view: requests are
//! persisted in the outbox first, so a failed `send` is logged and can be
//! replayed from storage. Consumers must tolerate duplicates.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use crate::NotificationRequest;

/// A subscription to delivered notifications.
///
/// Each subscription gets a copy of every request sent to the sink after it
/// subscribed (broadcast semantics). Meant for a single consuming thread.
///
/// ```ignore
/// let subscription = sink.subscribe();
/// loop {
///     match subscription.recv_timeout(Duration::from_secs(1)) {
///         Ok(request) => deliver(request)?,
///         Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
///         Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently queued without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Where committed notifications go.
///
/// `send()` may fail (queue closed, provider down). The engine logs the
/// failure and carries on; the committed transition is never rolled back
/// because of it.
pub trait NotificationSink: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn send(&self, request: NotificationRequest) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<NotificationRequest>;
}

impl<N> NotificationSink for Arc<N>
where
    N: NotificationSink + ?Sized,
{
    type Error = N::Error;

    fn send(&self, request: NotificationRequest) -> Result<(), Self::Error> {
        (**self).send(request)
    }

    fn subscribe(&self) -> Subscription<NotificationRequest> {
        (**self).subscribe()
    }
}
