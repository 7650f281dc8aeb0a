mod common;

use std::sync::Arc;

use serde_json::json;

use chessfed_core::notifications::{
    AdminAlert, LogOnlyEmailTransport, Notification, NotificationRepository, NotificationService,
    NotificationServiceTrait, NotificationType, User, UserRepository,
};

fn admin(id: &str, email: &str) -> User {
    User {
        id: id.to_string(),
        email: email.to_string(),
        display_name: None,
        is_admin: true,
    }
}

fn service(db: &common::TestDb) -> (NotificationService, Arc<UserRepository>) {
    let users = Arc::new(UserRepository::new(db.pool.clone()));
    let service = NotificationService::new(
        Arc::new(NotificationRepository::new(db.pool.clone())),
        users.clone(),
        Arc::new(LogOnlyEmailTransport),
    );
    (service, users)
}

fn sample_alert() -> AdminAlert {
    AdminAlert {
        notification_type: NotificationType::SyncFailure,
        title: "Federation import failed".to_string(),
        message: "too many consecutive failures".to_string(),
        details: None,
    }
}

#[tokio::test]
async fn test_alert_with_no_administrators_is_a_noop() {
    let db = common::setup_db();
    let (service, users) = service(&db);

    // Only a regular user exists.
    users
        .insert(&User {
            id: "u1".to_string(),
            email: "member@example.org".to_string(),
            display_name: Some("Member".to_string()),
            is_admin: false,
        })
        .unwrap();

    let created = service.send_admin_alerts(sample_alert(), None).await.unwrap();
    assert!(created.is_empty());
    assert!(service.get_unread_notifications("u1").unwrap().is_empty());
}

#[tokio::test]
async fn test_alert_fans_out_to_every_administrator() {
    let db = common::setup_db();
    let (service, users) = service(&db);

    users.insert(&admin("a1", "alice@example.org")).unwrap();
    users.insert(&admin("a2", "bob@example.org")).unwrap();

    let created = service
        .send_admin_alerts(sample_alert(), Some("log-42"))
        .await
        .unwrap();
    assert_eq!(created.len(), 2);

    for user_id in ["a1", "a2"] {
        let unread = service.get_unread_notifications(user_id).unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].title, "Federation import failed");
        assert!(!unread[0].is_read);
        // The originating run is recorded in the details payload.
        assert_eq!(unread[0].details.as_ref().unwrap()["syncLogId"], json!("log-42"));
    }
}

#[tokio::test]
async fn test_existing_details_are_kept_when_log_id_is_merged() {
    let db = common::setup_db();
    let (service, users) = service(&db);
    users.insert(&admin("a1", "alice@example.org")).unwrap();

    let alert = AdminAlert {
        details: Some(json!({ "phase": "PLAYERS" })),
        ..sample_alert()
    };
    let created = service.send_admin_alerts(alert, Some("log-7")).await.unwrap();

    let details = created[0].details.as_ref().unwrap();
    assert_eq!(details["phase"], json!("PLAYERS"));
    assert_eq!(details["syncLogId"], json!("log-7"));
}

#[tokio::test]
async fn test_mark_read_is_scoped_to_the_owner() {
    let db = common::setup_db();
    let (service, users) = service(&db);
    users.insert(&admin("a1", "alice@example.org")).unwrap();
    users.insert(&admin("a2", "bob@example.org")).unwrap();

    let created = service.send_admin_alerts(sample_alert(), None).await.unwrap();
    let alices = created.iter().find(|n| n.user_id == "a1").unwrap();

    // Another user cannot mark it; the call is a silent no-op.
    service.mark_notification_as_read(&alices.id, "a2").unwrap();
    assert_eq!(service.get_unread_notifications("a1").unwrap().len(), 1);

    service.mark_notification_as_read(&alices.id, "a1").unwrap();
    assert!(service.get_unread_notifications("a1").unwrap().is_empty());
    // Bob's copy is untouched.
    assert_eq!(service.get_unread_notifications("a2").unwrap().len(), 1);
}

#[tokio::test]
async fn test_unread_notifications_are_newest_first() {
    let db = common::setup_db();
    let (_, users) = service(&db);
    users.insert(&admin("a1", "alice@example.org")).unwrap();
    let repository = NotificationRepository::new(db.pool.clone());

    let base = chrono::Utc::now();
    for (i, title) in ["first", "second", "third"].iter().enumerate() {
        let notification = Notification {
            id: format!("n{}", i),
            user_id: "a1".to_string(),
            notification_type: NotificationType::SystemAlert,
            title: title.to_string(),
            message: "m".to_string(),
            details: None,
            is_read: false,
            created_at: base + chrono::Duration::seconds(i as i64),
        };
        repository.insert(&notification).unwrap();
    }

    let unread = repository.get_unread("a1").unwrap();
    assert_eq!(unread.len(), 3);
    assert_eq!(unread[0].title, "third");
    assert_eq!(unread[2].title, "first");
}
