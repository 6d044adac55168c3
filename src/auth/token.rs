//! Access token lifecycle models and redacted secrets.

pub mod access;
pub mod secret;
