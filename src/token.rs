/// Session and reset/invite token signing
///
/// Session tokens prove a completed sign-in and are verified on every
/// authenticated request. Reset tokens gate password reset and invitation
/// acceptance; they carry a random payload so two tokens issued for the same
/// account in the same second never collide. The two kinds are signed with
/// distinct secrets.
use crate::error::{ApiError, ApiResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Claims embedded in a session token
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account id
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims embedded in a reset or invite token
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetClaims {
    /// Account id the token was issued for
    pub sub: String,
    /// Random 32-byte payload, hex-encoded
    pub data: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies the service's tokens
#[derive(Clone)]
pub struct TokenSigner {
    session_secret: String,
    reset_secret: String,
}

impl TokenSigner {
    pub fn new(session_secret: String, reset_secret: String) -> Self {
        Self {
            session_secret,
            reset_secret,
        }
    }

    /// Issue a session token valid for one hour
    pub fn sign_session(&self, account_id: &str, email: &str) -> ApiResult<String> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: account_id.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now + 3600,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.session_secret.as_bytes()),
        )
        .map_err(|e| ApiError::Jwt(format!("Failed to sign session token: {}", e)))
    }

    /// Verify a session token and return its claims
    pub fn verify_session(&self, token: &str) -> ApiResult<SessionClaims> {
        decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.session_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ApiError::Authentication("Token expired. Please login again.".to_string())
            }
            _ => ApiError::Authentication("Invalid token. Please authenticate again.".to_string()),
        })
    }

    /// Issue a reset/invite token with the given validity window
    pub fn sign_reset(&self, account_id: &str, ttl: Duration) -> ApiResult<String> {
        let mut payload = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut payload);

        let now = Utc::now().timestamp();
        let claims = ResetClaims {
            sub: account_id.to_string(),
            data: hex::encode(payload),
            iat: now,
            exp: now + ttl.num_seconds(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.reset_secret.as_bytes()),
        )
        .map_err(|e| ApiError::Jwt(format!("Failed to sign reset token: {}", e)))
    }

    /// Verify a reset/invite token's signature and expiry claim
    ///
    /// This is one of the two independent checks performed on token
    /// consumption; the store lookup against the persisted token string is
    /// the other.
    pub fn verify_reset(&self, token: &str) -> ApiResult<ResetClaims> {
        decode::<ResetClaims>(
            token,
            &DecodingKey::from_secret(self.reset_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|_| ApiError::InvalidOrExpiredToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(
            "session-secret-for-tests-0123456789".to_string(),
            "reset-secret-for-tests-0123456789-x".to_string(),
        )
    }

    #[test]
    fn session_round_trip() {
        let signer = signer();
        let token = signer.sign_session("account-1", "a@x.com").unwrap();
        let claims = signer.verify_session(&token).unwrap();

        assert_eq!(claims.sub, "account-1");
        assert_eq!(claims.email, "a@x.com");
        assert!(claims.exp - claims.iat == 3600);
    }

    #[test]
    fn session_rejects_wrong_secret() {
        let signer = signer();
        let other = TokenSigner::new(
            "another-session-secret-0123456789-y".to_string(),
            "another-reset-secret-0123456789-yy".to_string(),
        );

        let token = signer.sign_session("account-1", "a@x.com").unwrap();
        assert!(other.verify_session(&token).is_err());
    }

    #[test]
    fn session_token_is_not_a_reset_token() {
        // The two signers use distinct secrets, so a session token must not
        // pass reset verification and vice versa.
        let signer = signer();
        let session = signer.sign_session("account-1", "a@x.com").unwrap();
        assert!(signer.verify_reset(&session).is_err());

        let reset = signer.sign_reset("account-1", Duration::hours(1)).unwrap();
        assert!(signer.verify_session(&reset).is_err());
    }

    #[test]
    fn reset_round_trip() {
        let signer = signer();
        let token = signer.sign_reset("account-2", Duration::hours(48)).unwrap();
        let claims = signer.verify_reset(&token).unwrap();

        assert_eq!(claims.sub, "account-2");
        assert_eq!(claims.data.len(), 64); // 32 bytes hex-encoded
    }

    #[test]
    fn reset_tokens_are_unique() {
        let signer = signer();
        let a = signer.sign_reset("account-2", Duration::hours(1)).unwrap();
        let b = signer.sign_reset("account-2", Duration::hours(1)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn expired_reset_rejected() {
        let signer = signer();
        // Well past the verifier's clock-skew leeway
        let token = signer
            .sign_reset("account-3", Duration::seconds(-120))
            .unwrap();

        match signer.verify_reset(&token) {
            Err(ApiError::InvalidOrExpiredToken) => {}
            other => panic!("Expected InvalidOrExpiredToken, got {:?}", other.map(|_| ())),
        }
    }
}
