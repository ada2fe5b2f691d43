//! User-facing error notifications.

/// Sink for the rare user-facing messages the resolver emits.
///
/// A resolution raises at most one notification, and only for the two
/// conditions a user can act on: no repository found, or a commit that
/// vanished from the local object store. Everything else stays silent.
pub trait Notifier: Send + Sync {
    fn error(&self, message: &str);
}

/// Discards every message. Useful for embedders that surface emptiness
/// through their own UI.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn error(&self, _message: &str) {}
}
