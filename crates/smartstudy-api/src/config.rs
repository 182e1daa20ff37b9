// Server configuration loaded from environment variables
// Decision: Read once at startup; nothing re-reads the environment per request

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use smartstudy_core::{AssistantConfig, DEFAULT_MODEL};

use crate::auth::AuthConfig;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9000";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Example: API_PREFIX="/api" results in /api/v1/assistant
    pub api_prefix: String,
    /// Only needed when the UI is served from a different origin
    pub cors_origins: Vec<HeaderValue>,
    /// Absent means in-memory stores
    pub database_url: Option<String>,
    pub assistant: AssistantConfig,
    pub auth: AuthConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        let api_prefix = normalize_prefix(&std::env::var("API_PREFIX").unwrap_or_default());

        let cors_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|s| parse_origins(&s))
            .unwrap_or_default();

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let model = std::env::var("LLM_MODEL")
            .or_else(|_| std::env::var("GROQ_MODEL"))
            .unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let mut assistant = AssistantConfig::new(model);
        if let Ok(max_tokens) = std::env::var("LLM_MAX_TOKENS") {
            let max_tokens = max_tokens
                .parse()
                .context("LLM_MAX_TOKENS must be a positive integer")?;
            assistant = assistant.with_max_tokens(max_tokens);
        }

        let auth = AuthConfig::from_env()?;

        Ok(Self {
            bind_addr,
            api_prefix,
            cors_origins,
            database_url,
            assistant,
            auth,
        })
    }
}

/// Leading slash, no trailing slash; empty stays empty
pub fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Comma separated origins; unparsable entries are skipped
pub fn parse_origins(raw: &str) -> Vec<HeaderValue> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix("api"), "/api");
        assert_eq!(normalize_prefix("/api/"), "/api");
        assert_eq!(normalize_prefix(" /api "), "/api");
    }

    #[test]
    fn test_parse_origins() {
        let origins = parse_origins("https://app.example.com, ,https://admin.example.com");
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], "https://app.example.com");
        assert!(parse_origins("").is_empty());
    }
}
