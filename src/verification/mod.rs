pub(crate) mod verification_model;
pub(crate) mod verification_repository;
pub(crate) mod verification_service;
pub(crate) mod verification_traits;

#[cfg(test)]
pub(crate) mod tests;

pub use verification_model::{
    sample_size, Discrepancy, EntityTypeResult, Severity, VerificationConfig, VerificationReport,
    VerificationStatus, VerificationTrigger,
};
pub use verification_repository::VerificationRepository;
pub use verification_service::VerificationService;
pub use verification_traits::{SourceDetailLookup, VerificationServiceTrait};
