use async_trait::async_trait;
use log::{info, warn};
use std::sync::Arc;

use crate::errors::Result;

use super::notifications_model::{AdminAlert, Notification};
use super::notifications_repository::NotificationRepository;
use super::notifications_traits::{EmailTransport, NotificationServiceTrait, UserDirectory};

pub struct NotificationService {
    notification_repository: Arc<NotificationRepository>,
    user_directory: Arc<dyn UserDirectory>,
    email: Arc<dyn EmailTransport>,
}

impl NotificationService {
    pub fn new(
        notification_repository: Arc<NotificationRepository>,
        user_directory: Arc<dyn UserDirectory>,
        email: Arc<dyn EmailTransport>,
    ) -> Self {
        NotificationService {
            notification_repository,
            user_directory,
            email,
        }
    }
}

#[async_trait]
impl NotificationServiceTrait for NotificationService {
    async fn send_admin_alerts(
        &self,
        mut alert: AdminAlert,
        sync_log_id: Option<&str>,
    ) -> Result<Vec<Notification>> {
        if let Some(log_id) = sync_log_id {
            let details = alert
                .details
                .get_or_insert_with(|| serde_json::json!({}));
            if let Some(obj) = details.as_object_mut() {
                obj.entry("syncLogId")
                    .or_insert_with(|| serde_json::json!(log_id));
            }
        }

        let admins = self.user_directory.list_administrators()?;
        if admins.is_empty() {
            info!("No administrators to notify for '{}'", alert.title);
            return Ok(Vec::new());
        }

        let mut created = Vec::with_capacity(admins.len());
        for admin in &admins {
            let notification = Notification::new(&admin.id, &alert);
            self.notification_repository.insert(&notification)?;

            // The row above is the durable guarantee; email is best-effort.
            if let Err(e) = self.email.send_email(&admin.email, &notification).await {
                warn!("Email delivery to {} failed: {}", admin.email, e);
            }
            created.push(notification);
        }

        info!("Dispatched '{}' to {} administrator(s)", alert.title, created.len());
        Ok(created)
    }

    fn mark_notification_as_read(
        &self,
        notification_id: &str,
        requesting_user_id: &str,
    ) -> Result<()> {
        let updated = self
            .notification_repository
            .mark_read(notification_id, requesting_user_id)?;
        if updated == 0 {
            // Not owned by the requester (or unknown id): silent no-op.
            info!(
                "Ignored mark-read for {} by non-owner {}",
                notification_id, requesting_user_id
            );
        }
        Ok(())
    }

    fn get_unread_notifications(&self, user_id: &str) -> Result<Vec<Notification>> {
        self.notification_repository.get_unread(user_id)
    }
}

/// Email transport that only logs. Used where no SMTP relay is configured;
/// in-app notifications still land.
pub struct LogOnlyEmailTransport;

#[async_trait]
impl EmailTransport for LogOnlyEmailTransport {
    async fn send_email(&self, recipient: &str, notification: &Notification) -> Result<()> {
        info!("[email:{}] {}: {}", recipient, notification.title, notification.message);
        Ok(())
    }
}
