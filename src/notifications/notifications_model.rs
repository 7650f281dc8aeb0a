use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    SyncFailure,
    SyncSuccess,
    SystemAlert,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationType::SyncFailure => "SYNC_FAILURE",
            NotificationType::SyncSuccess => "SYNC_SUCCESS",
            NotificationType::SystemAlert => "SYSTEM_ALERT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "SYNC_FAILURE" => Some(NotificationType::SyncFailure),
            "SYNC_SUCCESS" => Some(NotificationType::SyncSuccess),
            "SYSTEM_ALERT" => Some(NotificationType::SystemAlert),
            _ => None,
        }
    }
}

/// In-app notification scoped to one administrator. The persisted row is
/// the durable guarantee; email delivery is best-effort on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub details: Option<Value>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: &str, alert: &AdminAlert) -> Self {
        Notification {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            notification_type: alert.notification_type,
            title: alert.title.clone(),
            message: alert.message.clone(),
            details: alert.details.clone(),
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

/// The content of one alert, fanned out to every administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAlert {
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
}

#[derive(Queryable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserDB {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
    pub created_at: String,
}

impl From<UserDB> for User {
    fn from(row: UserDB) -> Self {
        User {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            is_admin: row.is_admin,
        }
    }
}

#[derive(Queryable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::notifications)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct NotificationDB {
    pub id: String,
    pub user_id: String,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub details: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}

impl Notification {
    pub(crate) fn to_row(&self) -> NotificationDB {
        NotificationDB {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            notification_type: self.notification_type.as_str().to_string(),
            title: self.title.clone(),
            message: self.message.clone(),
            details: self
                .details
                .as_ref()
                .and_then(|d| serde_json::to_string(d).ok()),
            is_read: self.is_read,
            created_at: self.created_at.to_rfc3339(),
        }
    }
}

impl From<NotificationDB> for Notification {
    fn from(row: NotificationDB) -> Self {
        Notification {
            id: row.id,
            user_id: row.user_id,
            notification_type: NotificationType::from_str(&row.notification_type)
                .unwrap_or(NotificationType::SystemAlert),
            title: row.title,
            message: row.message,
            details: row.details.as_deref().and_then(|d| serde_json::from_str(d).ok()),
            is_read: row.is_read,
            created_at: DateTime::parse_from_rfc3339(&row.created_at)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        }
    }
}
