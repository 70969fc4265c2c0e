//! Convenience re-exports for common use.

pub use crate::auth::{Credential, CredentialStore, TokenAuthority};
pub use crate::config::SessionConfig;
pub use crate::error::{ErrorKind, Result, SessionError};
pub use crate::load::{LoadCoordinator, ResultModel, Slot};
pub use crate::session::Session;
pub use crate::transport::{HttpRequest, HttpResponse, Transport};
