//! Credential and session handling for the marketplace.

pub mod config;
pub mod password;
pub mod session;

pub use config::AuthConfig;
pub use session::{Session, SessionUser};
