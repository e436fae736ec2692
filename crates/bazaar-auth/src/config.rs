//! Authentication configuration.

use chrono::Duration;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// How long a login stays valid (default: 7 days).
    pub session_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::days(7),
        }
    }
}
