use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::AuthConfig;
use crate::errors::{BiolinkerError, Result};
use crate::rbac::SessionIdentity;

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    /// Session id; keys the per-session permission cache
    pub jti: String,
    /// Legacy flat role, informational only
    pub role: String,
}

impl SessionClaims {
    pub fn identity(&self) -> Result<SessionIdentity> {
        let user_id = self
            .sub
            .parse::<i64>()
            .map_err(|_| BiolinkerError::token("malformed subject"))?;
        Ok(SessionIdentity {
            user_id,
            session_id: self.jti.clone(),
            legacy_role: self.role.clone(),
        })
    }
}

/// Freshly issued session
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session_id: String,
    pub expires_in: u64,
}

/// HS256 session tokens
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_minutes: u64,
}

impl JwtService {
    pub fn new(secret: &str, session_minutes: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            session_minutes: session_minutes.max(1),
        }
    }

    /// An empty secret gets a random one; sessions then do not survive a restart
    pub fn from_auth_config(auth: &AuthConfig) -> Self {
        let secret = if auth.jwt_secret.is_empty() {
            warn!("JWT secret not configured, generating a random one for this process");
            hex::encode(rand::random::<[u8; 32]>())
        } else {
            auth.jwt_secret.clone()
        };
        Self::new(&secret, auth.session_minutes)
    }

    pub fn session_minutes(&self) -> u64 {
        self.session_minutes
    }

    pub fn issue(&self, user_id: i64, legacy_role: &str) -> Result<IssuedSession> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.session_minutes as i64)).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            role: legacy_role.to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(IssuedSession {
            token,
            session_id: claims.jti,
            expires_in: self.session_minutes * 60,
        })
    }

    pub fn validate(&self, token: &str) -> Result<SessionClaims> {
        let data = decode::<SessionClaims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> JwtService {
        JwtService::new("test_secret_key_32_bytes_long!!", 15)
    }

    #[test]
    fn issue_and_validate() {
        let service = create_test_service();
        let issued = service.issue(42, "admin").unwrap();
        let claims = service.validate(&issued.token).unwrap();

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.jti, issued.session_id);
        assert!(claims.exp > claims.iat);
        assert_eq!(issued.expires_in, 15 * 60);

        let identity = claims.identity().unwrap();
        assert_eq!(identity.user_id, 42);
        assert_eq!(identity.legacy_role, "admin");
    }

    #[test]
    fn each_session_gets_its_own_id() {
        let service = create_test_service();
        let a = service.issue(1, "user").unwrap();
        let b = service.issue(1, "user").unwrap();
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = create_test_service().issue(1, "user").unwrap().token;
        let other = JwtService::new("different_secret_key_32_bytes!!", 15);
        assert!(matches!(other.validate(&token), Err(BiolinkerError::Token(_))));
    }

    #[test]
    fn garbage_rejected() {
        assert!(create_test_service().validate("invalid.token.here").is_err());
    }

    #[test]
    fn expired_token_rejected() {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: "1".to_string(),
            iat: (now - Duration::hours(2)).timestamp(),
            exp: (now - Duration::hours(1)).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            role: "user".to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test_secret_key_32_bytes_long!!"),
        )
        .unwrap();
        assert!(create_test_service().validate(&token).is_err());
    }

    #[test]
    fn non_numeric_subject_is_a_token_error() {
        let claims = SessionClaims {
            sub: "admin".into(),
            iat: 0,
            exp: 0,
            jti: "x".into(),
            role: "admin".into(),
        };
        assert!(matches!(claims.identity(), Err(BiolinkerError::Token(_))));
    }

    #[test]
    fn random_secret_when_unconfigured() {
        let auth = AuthConfig {
            jwt_secret: String::new(),
            ..AuthConfig::default()
        };
        let a = JwtService::from_auth_config(&auth);
        let b = JwtService::from_auth_config(&auth);
        let token = a.issue(7, "user").unwrap().token;
        assert!(a.validate(&token).is_ok());
        assert!(b.validate(&token).is_err());
    }
}
