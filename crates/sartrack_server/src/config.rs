//! Host configuration.

/// Configuration for the tracker host.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Whether mutation operations require a bearer credential.
    pub require_auth: bool,
    /// The shared activity credential (if auth enabled).
    pub auth_secret: Option<String>,
}

impl ServerConfig {
    /// Creates a configuration with authentication disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires the given shared bearer credential on every mutation.
    pub fn with_auth(mut self, secret: impl Into<String>) -> Self {
        self.require_auth = true;
        self.auth_secret = Some(secret.into());
        self
    }
}
