pub mod db;

pub mod constants;
pub mod entities;
pub mod errors;
pub mod import;
pub mod notifications;
pub mod providers;
pub mod schema;
pub mod verification;

pub use errors::{Error, Result};
