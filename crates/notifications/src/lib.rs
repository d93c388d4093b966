//! Workflow notifications.
//!
//! The engine never talks to a mail server or a push service. It builds a
//! [`NotificationRequest`], stores it in the outbox of the same unit of work as
//! the status change (see [`NotificationEnvelope`]), and hands it to a
//! [`NotificationSink`] after commit.

pub mod envelope;
pub mod in_memory;
pub mod request;
pub mod sink;

pub use envelope::NotificationEnvelope;
pub use in_memory::{InMemoryNotificationSink, InMemorySinkError};
pub use request::{NotificationKind, NotificationRequest, Recipient};
pub use sink::{NotificationSink, Subscription};
