pub(crate) mod notifications_model;
pub(crate) mod notifications_repository;
pub(crate) mod notifications_service;
pub(crate) mod notifications_traits;

pub use notifications_model::{AdminAlert, Notification, NotificationType, User};
pub use notifications_repository::{NotificationRepository, UserRepository};
pub use notifications_service::{LogOnlyEmailTransport, NotificationService};
pub use notifications_traits::{EmailTransport, NotificationServiceTrait, UserDirectory};
