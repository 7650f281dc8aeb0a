pub(crate) mod federation_provider;
pub(crate) mod provider_errors;

pub use federation_provider::FederationApiProvider;
pub use provider_errors::ProviderError;
