// Authentication module
// Decision: Token issuance lives in the account service; this server only verifies
// Decision: Default to "none" mode for local development

pub mod config;
pub mod jwt;
pub mod middleware;

pub use config::{AuthConfig, AuthMode};
pub use jwt::JwtService;
pub use middleware::{AuthError, AuthMethod, AuthState, AuthUser};
