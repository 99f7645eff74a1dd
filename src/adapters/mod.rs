// Adapters layer: concrete implementations of the domain ports.

pub mod azure;
pub mod credentials;
pub mod storage;

pub use azure::AzureControlPlane;
pub use credentials::StaticTokenProvider;
pub use storage::LocalStorage;
