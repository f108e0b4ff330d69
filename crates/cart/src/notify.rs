//! User-visible error notifications.
//!
//! Cart operations never surface errors to their callers; the notification
//! sink is the only failure channel the UI observes. Messages are
//! fire-and-forget.

use tracing::error;

/// Sink for user-visible error messages.
pub trait NotificationSink: Send + Sync {
    /// Report an error message to the user.
    fn error(&self, message: &str);
}

/// Notification sink that emits messages to the `tracing` error stream.
///
/// Stands in for the storefront's toast layer when no UI is attached.
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn error(&self, message: &str) {
        error!(target: "rocket_shoes_cart::notify", "{message}");
    }
}
