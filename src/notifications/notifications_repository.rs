use diesel::prelude::*;
use std::sync::Arc;

use crate::db::{get_connection, DbPool};
use crate::errors::Result;
use crate::schema::{notifications, users};

use super::notifications_model::{Notification, NotificationDB, User, UserDB};
use super::notifications_traits::UserDirectory;

pub struct NotificationRepository {
    pool: Arc<DbPool>,
}

impl NotificationRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        NotificationRepository { pool }
    }

    pub fn insert(&self, notification: &Notification) -> Result<()> {
        let mut conn = get_connection(&self.pool)?;
        diesel::insert_into(notifications::table)
            .values(notification.to_row())
            .execute(&mut conn)?;
        Ok(())
    }

    /// Flips `is_read` for one notification, scoped to its owner. Returns
    /// the number of rows touched: 0 means the notification does not exist
    /// or belongs to someone else.
    pub fn mark_read(&self, notification_id: &str, owner_id: &str) -> Result<usize> {
        let mut conn = get_connection(&self.pool)?;
        let updated = diesel::update(
            notifications::table
                .filter(notifications::id.eq(notification_id))
                .filter(notifications::user_id.eq(owner_id)),
        )
        .set(notifications::is_read.eq(true))
        .execute(&mut conn)?;
        Ok(updated)
    }

    pub fn get_unread(&self, user_id: &str) -> Result<Vec<Notification>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = notifications::table
            .filter(notifications::user_id.eq(user_id))
            .filter(notifications::is_read.eq(false))
            .order(notifications::created_at.desc())
            .select(NotificationDB::as_select())
            .load::<NotificationDB>(&mut conn)?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }
}

pub struct UserRepository {
    pool: Arc<DbPool>,
}

impl UserRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        UserRepository { pool }
    }

    pub fn insert(&self, user: &User) -> Result<()> {
        let mut conn = get_connection(&self.pool)?;
        diesel::insert_into(users::table)
            .values(UserDB {
                id: user.id.clone(),
                email: user.email.clone(),
                display_name: user.display_name.clone(),
                is_admin: user.is_admin,
                created_at: chrono::Utc::now().to_rfc3339(),
            })
            .execute(&mut conn)?;
        Ok(())
    }
}

impl UserDirectory for UserRepository {
    fn list_administrators(&self) -> Result<Vec<User>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = users::table
            .filter(users::is_admin.eq(true))
            .order(users::email.asc())
            .select(UserDB::as_select())
            .load::<UserDB>(&mut conn)?;
        Ok(rows.into_iter().map(User::from).collect())
    }
}
