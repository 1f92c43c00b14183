//! Common types for the OIDC client workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
