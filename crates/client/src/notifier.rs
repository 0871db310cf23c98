//! User-facing failure notifications.

/// Shows an interruptive message to the user, e.g. a modal alert.
pub trait Notifier: Send + Sync {
    fn alert(&self, title: &str, message: &str);
}

/// Notifier that only logs. Used where no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn alert(&self, title: &str, message: &str) {
        tracing::warn!(title, message, "User alert");
    }
}
