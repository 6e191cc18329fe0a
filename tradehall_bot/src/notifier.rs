use log::*;
use tradehall_engine::{db_types::UserId, Notification, Notifier};

/// A stand-in delivery channel that writes every notification to the log.
///
/// The chat-platform integration implements [`Notifier`] against its own SDK; the daemon runs with this one when no
/// integration is wired up, which keeps the engine's flows observable end to end.
#[derive(Clone, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify_user(&self, user: &UserId, note: Notification) -> bool {
        info!("📨️ [dm -> {user}] {} ({:?})", note.body, note.kind);
        true
    }

    async fn notify_channel(&self, channel: &str, note: Notification) -> bool {
        info!("📨️ [#{channel}] {} ({:?})", note.body, note.kind);
        true
    }
}
