//! Credentials, their storage, and the refresh protocol.

pub mod authority;
pub mod credential;
pub mod error;
pub mod service;
pub mod store;

pub use authority::{RefreshEndpoint, RefreshRejection, TokenAuthority, DEFAULT_REFRESH_HEADER};
pub use credential::Credential;
pub use error::AuthError;
pub use service::{AuthService, Registration};
pub use store::{CredentialStore, CredentialStoreConfig, FileCredentialStore, MemoryCredentialStore};
