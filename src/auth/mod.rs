//! Authentication module
//!
//! OAuth2 client-credentials tokens for the two API scopes (`read` and
//! `write`), cached per scope and refreshed shortly before expiry.
//!
//! The [`CredentialManager`] owns every token; the rest of the crate only
//! ever receives the rendered access token string.

mod manager;
mod shared;
mod types;

pub use manager::CredentialManager;
pub use shared::{global, init_global, CredentialManagerCell};
