use async_trait::async_trait;

use super::notifications_model::{AdminAlert, Notification, User};
use crate::errors::Result;

/// Where administrator accounts come from.
pub trait UserDirectory: Send + Sync {
    fn list_administrators(&self) -> Result<Vec<User>>;
}

/// External delivery channel. Failures are logged by callers, never
/// propagated; the persisted in-app notification is the durable guarantee.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send_email(&self, recipient: &str, notification: &Notification) -> Result<()>;
}

#[async_trait]
pub trait NotificationServiceTrait: Send + Sync {
    /// Persists one notification per administrator, then attempts email
    /// delivery for each. Zero administrators is a no-op, not an error.
    async fn send_admin_alerts(
        &self,
        alert: AdminAlert,
        sync_log_id: Option<&str>,
    ) -> Result<Vec<Notification>>;

    /// Marks a notification read only when it belongs to the requesting
    /// user; otherwise a silent no-op.
    fn mark_notification_as_read(&self, notification_id: &str, requesting_user_id: &str)
        -> Result<()>;

    fn get_unread_notifications(&self, user_id: &str) -> Result<Vec<Notification>>;
}
