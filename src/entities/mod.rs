pub(crate) mod entities_model;
pub(crate) mod entities_repository;

pub use entities_model::RawEntity;
pub use entities_repository::EntityRepository;
