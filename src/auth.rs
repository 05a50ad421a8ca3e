/// Authentication extractors and permission gates
use crate::{
    context::AppContext,
    db::account::{Account, Role},
    error::ApiError,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

/// Authenticated context - extracted from a bearer session token
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account_id: String,
    pub email: String,
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or_else(|| {
            ApiError::Authentication("Unauthorized. Token is required.".to_string())
        })?;

        let claims = state.signer.verify_session(&token)?;

        Ok(AuthContext {
            account_id: claims.sub,
            email: claims.email,
        })
    }
}

/// Capability required by an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Create,
    Read,
    Update,
    Delete,
}

impl Capability {
    fn as_str(&self) -> &'static str {
        match self {
            Capability::Create => "create",
            Capability::Read => "read",
            Capability::Update => "update",
            Capability::Delete => "delete",
        }
    }
}

/// Require the admin role
pub fn require_admin(account: &Account) -> Result<(), ApiError> {
    if account.role != Role::Admin {
        return Err(ApiError::Authorization(
            "You don't have permission to perform this action".to_string(),
        ));
    }
    Ok(())
}

/// Require a capability flag on the account
pub fn require_capability(account: &Account, capability: Capability) -> Result<(), ApiError> {
    let allowed = match capability {
        Capability::Create => account.permissions.can_create,
        Capability::Read => account.permissions.can_read,
        Capability::Update => account.permissions.can_update,
        Capability::Delete => account.permissions.can_delete,
    };

    if !allowed {
        return Err(ApiError::Authorization(format!(
            "You don't have permission to {} resources",
            capability.as_str()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::account::{AccountStatus, Permissions};
    use axum::http::HeaderValue;
    use chrono::Utc;

    fn account(role: Role, permissions: Permissions) -> Account {
        Account {
            id: "account-1".to_string(),
            email: "a@x.com".to_string(),
            password_hash: Some("hash".to_string()),
            role,
            status: AccountStatus::Active,
            name: "".to_string(),
            phone_number: "".to_string(),
            permissions,
            reset_token: None,
            reset_token_expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_bearer_token(&headers), Some("abc123".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("abc123"));
        assert_eq!(extract_bearer_token(&headers), None);

        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn admin_gate() {
        assert!(require_admin(&account(Role::Admin, Permissions::default())).is_ok());
        assert!(require_admin(&account(Role::Parent, Permissions::default())).is_err());
    }

    #[test]
    fn capability_gate() {
        let reader = account(Role::Parent, Permissions::default());
        assert!(require_capability(&reader, Capability::Read).is_ok());
        assert!(require_capability(&reader, Capability::Create).is_err());
        assert!(require_capability(&reader, Capability::Delete).is_err());

        let full = account(
            Role::Admin,
            Permissions {
                can_create: true,
                can_read: true,
                can_update: true,
                can_delete: true,
                is_global_admin: false,
            },
        );
        for capability in [
            Capability::Create,
            Capability::Read,
            Capability::Update,
            Capability::Delete,
        ] {
            assert!(require_capability(&full, capability).is_ok());
        }
    }
}
