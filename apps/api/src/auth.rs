//! JWT authentication and password hashing.
//!
//! Handles token generation/validation, argon2 credential hashing, and the
//! `CurrentUser` extractor that authenticates every protected endpoint.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;
use cyltrack_core::policy::{authorize, authorize_self_or, Action};
use cyltrack_core::{Role, User};

// =============================================================================
// JWT
// =============================================================================

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Login email at issue time
    pub email: String,

    /// Role at issue time
    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

/// JWT token manager.
#[derive(Clone)]
pub struct JwtManager {
    secret: String,
    access_lifetime_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager.
    pub fn new(secret: String, access_lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            access_lifetime_secs,
        }
    }

    /// Generate an access token for a user.
    pub fn generate_access_token(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_lifetime_secs);

        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to generate token: {e}")))
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let validation = Validation::default();

        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| ApiError::unauthorized(format!("Invalid token: {e}")))?;

        Ok(token_data.claims)
    }

    /// Access token lifetime in seconds (for the token response body).
    pub fn access_lifetime_secs(&self) -> i64 {
        self.access_lifetime_secs
    }
}

/// Extract bearer token from an authorization header value.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

// =============================================================================
// Password Hashing
// =============================================================================

/// Hashes a password with argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {e}")))
}

/// Verifies a password against a stored argon2 hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// =============================================================================
// CurrentUser Extractor
// =============================================================================

/// The authenticated caller, loaded fresh from the database.
///
/// Rejections:
/// - 401 when the bearer token is missing, malformed, expired, or the
///   account no longer exists or is inactive
///
/// Authorization (403) happens separately via [`CurrentUser::require`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    /// Checks the policy table for this caller.
    pub fn require(&self, action: Action) -> Result<(), ApiError> {
        authorize(self.0.role, action).map_err(ApiError::from)
    }

    /// Policy check with the own-record override (users endpoints).
    pub fn require_self_or(&self, target_id: &str, action: Action) -> Result<(), ApiError> {
        authorize_self_or(self.0.role, &self.0.id, target_id, action).map_err(ApiError::from)
    }
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing authorization header"))?;

        let token = extract_bearer_token(header_value)
            .ok_or_else(|| ApiError::unauthorized("Expected bearer token"))?;

        let claims = state.jwt.validate_token(token)?;

        // Token claims are a hint; the account itself is authoritative
        let user = state
            .db
            .users()
            .get_by_id(&claims.sub)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Unknown user"))?;

        if !user.is_active {
            return Err(ApiError::unauthorized("Inactive user"));
        }

        Ok(CurrentUser(user))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: "user-1".to_string(),
            email: "mgr@cyltrack.example".to_string(),
            password_hash: String::new(),
            full_name: "Morgan".to_string(),
            role: Role::Manager,
            is_active: true,
            phone: None,
            address: None,
            license_number: None,
            vehicle_id: None,
            certification: None,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret".to_string(), 3600);
        let user = sample_user();

        let token = manager.generate_access_token(&user).unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "mgr@cyltrack.example");
        assert_eq!(claims.role, Role::Manager);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtManager::new("secret-a".to_string(), 3600);
        let verifier = JwtManager::new("secret-b".to_string(), 3600);

        let token = issuer.generate_access_token(&sample_user()).unwrap();
        assert!(verifier.validate_token(&token).is_err());
    }

    #[test]
    fn test_bearer_extraction() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token(""), None);
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("hunter2").unwrap();
        assert_ne!(hash, "hunter2");
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", "not-a-hash"));
    }

    #[test]
    fn test_require_uses_policy_table() {
        let caller = CurrentUser(sample_user());
        assert!(caller.require(Action::CreateCylinder).is_ok());
        assert!(caller.require(Action::DeleteCustomer).is_err());
        assert!(caller.require_self_or("user-1", Action::UpdateUser).is_ok());
        assert!(caller.require_self_or("user-9", Action::UpdateUser).is_err());
    }
}
