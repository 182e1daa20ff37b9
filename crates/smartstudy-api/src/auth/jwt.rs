// JWT verification
// Decision: HS256 with a shared secret, expiry always checked

use anyhow::{anyhow, Context, Result};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims we read from a bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerClaims {
    /// User id as issued by the account service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Standard subject, used when `id` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl OwnerClaims {
    pub fn owner_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.sub.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Clone)]
pub struct JwtService {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Validate a token and return the owner id it carries
    pub fn validate(&self, token: &str) -> Result<String> {
        let data = decode::<OwnerClaims>(token, &self.decoding_key, &self.validation)
            .context("Invalid token")?;

        data.claims
            .owner_id()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Token carries no user id"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn token(claims: &OwnerClaims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn in_an_hour() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn test_id_claim_wins_over_sub() {
        let service = JwtService::new(SECRET);
        let claims = OwnerClaims {
            id: Some("665f1c".to_string()),
            sub: Some("other".to_string()),
            exp: in_an_hour(),
        };
        assert_eq!(service.validate(&token(&claims, SECRET)).unwrap(), "665f1c");
    }

    #[test]
    fn test_sub_fallback() {
        let service = JwtService::new(SECRET);
        let claims = OwnerClaims {
            id: None,
            sub: Some("user-42".to_string()),
            exp: in_an_hour(),
        };
        assert_eq!(service.validate(&token(&claims, SECRET)).unwrap(), "user-42");
    }

    #[test]
    fn test_rejects_wrong_secret_and_expired() {
        let service = JwtService::new(SECRET);
        let claims = OwnerClaims {
            id: Some("u1".to_string()),
            sub: None,
            exp: in_an_hour(),
        };
        assert!(service.validate(&token(&claims, "another")).is_err());

        let expired = OwnerClaims {
            exp: chrono::Utc::now().timestamp() - 3600,
            ..claims
        };
        assert!(service.validate(&token(&expired, SECRET)).is_err());
    }

    #[test]
    fn test_rejects_token_without_owner() {
        let service = JwtService::new(SECRET);
        let claims = OwnerClaims {
            id: Some("  ".to_string()),
            sub: None,
            exp: in_an_hour(),
        };
        assert!(service.validate(&token(&claims, SECRET)).is_err());
    }
}
