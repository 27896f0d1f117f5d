//! Dismissible reviewer notifications for conflicts and failed loads or saves.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// The server rejected a save; local edits were replaced by server truth.
    VersionConflict,
    /// A save failed for a transport reason; local state is unchanged.
    SaveFailed,
    /// The refetch after a conflict failed; the view may be stale.
    RefetchFailed,
    /// Loading a case failed for a transport reason; the previous state is kept.
    LoadFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionNotification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub aml_id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl SessionNotification {
    pub fn new(kind: NotificationKind, aml_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            aml_id: aml_id.into(),
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

/// Broadcasts notifications and keeps them active until dismissed.
pub struct Notifier {
    sender: broadcast::Sender<SessionNotification>,
    active: Mutex<Vec<SessionNotification>>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            active: Mutex::new(Vec::new()),
        }
    }

    pub fn publish(&self, notification: SessionNotification) {
        tracing::warn!(
            "Notification {:?} for case {}: {}",
            notification.kind,
            notification.aml_id,
            notification.message
        );

        if let Ok(mut active) = self.active.lock() {
            active.push(notification.clone());
        }
        // No subscribers is fine; the active list still holds the notification.
        let _ = self.sender.send(notification);
    }

    pub fn subscribe(&self) -> BroadcastStream<SessionNotification> {
        BroadcastStream::new(self.sender.subscribe())
    }

    pub fn active(&self) -> Vec<SessionNotification> {
        self.active
            .lock()
            .map(|active| active.clone())
            .unwrap_or_default()
    }

    /// Removes a notification from the active list. Returns whether it was there.
    pub fn dismiss(&self, id: Uuid) -> bool {
        match self.active.lock() {
            Ok(mut active) => {
                let before = active.len();
                active.retain(|n| n.id != id);
                active.len() != before
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let notifier = Notifier::new();
        let mut stream = notifier.subscribe();

        notifier.publish(SessionNotification::new(
            NotificationKind::VersionConflict,
            "AML-1",
            "stale",
        ));

        let received = stream.next().await.unwrap().unwrap();
        assert_eq!(received.kind, NotificationKind::VersionConflict);
    }

    #[test]
    fn test_dismiss() {
        let notifier = Notifier::new();
        let notification = SessionNotification::new(NotificationKind::SaveFailed, "AML-1", "down");
        let id = notification.id;
        notifier.publish(notification);

        assert_eq!(notifier.active().len(), 1);
        assert!(notifier.dismiss(id));
        assert!(!notifier.dismiss(id));
        assert!(notifier.active().is_empty());
    }
}
