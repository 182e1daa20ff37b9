// Authentication extractor
// Decision: In "none" mode, every request acts as one anonymous owner

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use smartstudy_core::OwnerId;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    config::{AuthConfig, AuthMode},
    jwt::JwtService,
};

/// Authentication error
#[derive(Debug, Clone, Serialize)]
pub struct AuthError {
    pub error: String,
    #[serde(skip)]
    pub status: StatusCode,
}

impl AuthError {
    pub fn unauthorized(message: &str) -> Self {
        Self {
            error: message.to_string(),
            status: StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Authentication method used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    None,
    Jwt,
}

/// Owner of the request, as established by authentication
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub owner: OwnerId,
    pub auth_method: AuthMethod,
}

impl AuthUser {
    pub fn anonymous() -> Self {
        Self {
            owner: OwnerId::new(Uuid::nil().to_string()),
            auth_method: AuthMethod::None,
        }
    }
}

/// Auth state shared across routes
#[derive(Clone)]
pub struct AuthState {
    pub mode: AuthMode,
    jwt_service: Option<Arc<JwtService>>,
}

impl AuthState {
    pub fn new(config: &AuthConfig) -> Self {
        let jwt_service = match config.mode {
            AuthMode::Jwt => Some(Arc::new(JwtService::new(&config.jwt_secret))),
            AuthMode::None => None,
        };
        Self {
            mode: config.mode,
            jwt_service,
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        extract_auth_user(parts, &auth_state)
    }
}

fn extract_auth_user(parts: &Parts, auth_state: &AuthState) -> Result<AuthUser, AuthError> {
    let Some(jwt_service) = auth_state.jwt_service.as_ref() else {
        return Ok(AuthUser::anonymous());
    };

    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AuthError::unauthorized("No auth header"))?;

    let token = auth_header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or_else(|| AuthError::unauthorized("Invalid token"))?;

    let owner = jwt_service.validate(token).map_err(|e| {
        tracing::debug!("JWT validation failed: {:#}", e);
        AuthError::unauthorized("Invalid token")
    })?;

    Ok(AuthUser {
        owner: OwnerId::new(owner),
        auth_method: AuthMethod::Jwt,
    })
}
