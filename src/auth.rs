//! Credential model and secret handling.

pub mod credential;
pub mod secret;

pub use credential::*;
pub use secret::*;
