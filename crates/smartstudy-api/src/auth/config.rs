// Authentication configuration loaded from environment variables.
// Decision: AUTH_ prefix for all auth config, JWT_SECRET accepted as a fallback

use anyhow::{bail, Result};

/// Authentication mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// No authentication required (local development)
    #[default]
    None,
    /// HS256 bearer tokens
    Jwt,
}

impl AuthMode {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "jwt" => AuthMode::Jwt,
            _ => AuthMode::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::None => "none",
            AuthMode::Jwt => "jwt",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub mode: AuthMode,
    /// Shared HS256 secret; empty in `none` mode
    pub jwt_secret: String,
}

impl AuthConfig {
    /// Anonymous access, for local development and tests
    pub fn none() -> Self {
        Self::default()
    }

    pub fn jwt(secret: impl Into<String>) -> Self {
        Self {
            mode: AuthMode::Jwt,
            jwt_secret: secret.into(),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mode = std::env::var("AUTH_MODE")
            .map(|s| AuthMode::parse(&s))
            .unwrap_or_default();

        let secret = std::env::var("AUTH_JWT_SECRET")
            .or_else(|_| std::env::var("JWT_SECRET"))
            .unwrap_or_default();

        match mode {
            AuthMode::None => Ok(Self::none()),
            AuthMode::Jwt if secret.is_empty() => {
                bail!("AUTH_MODE=jwt requires AUTH_JWT_SECRET")
            }
            AuthMode::Jwt => Ok(Self::jwt(secret)),
        }
    }
}
