/// Account management system
///
/// Request/response types for the account API. The credential and token
/// lifecycle itself lives in `manager`.

mod manager;

pub use manager::AccountManager;

use crate::db::account::{Account, AccountStatus, Permissions, Role};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Generic answer to a password-reset request, returned whether or not the
/// email is registered.
pub const RESET_REQUEST_MESSAGE: &str =
    "If that email address is in our database, we will send you a password recovery link.";

/// Public fields of an account
///
/// Never carries the password hash or the reset-token fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,
    pub name: String,
    pub permissions: Permissions,
    pub phone_number: String,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            email: account.email.clone(),
            role: account.role,
            status: account.status,
            name: account.name.clone(),
            permissions: account.permissions,
            phone_number: account.phone_number.clone(),
        }
    }
}

/// Sign-in request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Self-service signup request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub role: Role,
    pub permissions: Option<Permissions>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone_number: String,
}

/// Sign-in/signup response: the account's public fields plus a session token
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    #[serde(flatten)]
    pub account: AccountView,
    pub token: String,
}

/// Password reset request (step one of the reset flow)
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[serde(default)]
    pub captcha_token: String,
}

/// Token consumption request, shared by reset-password and set-password
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ConsumeTokenRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Admin-initiated invitation request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InviteAccountRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    pub role: Role,
    pub permissions: Option<Permissions>,
    #[serde(default)]
    pub phone_number: String,
}

/// Account detail update request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    pub role: Role,
    pub permissions: Permissions,
    #[serde(default)]
    pub phone_number: String,
}

/// Listing filters for account administration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAccountsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Case-insensitive match against name and email
    pub search: Option<String>,
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
}

/// Paginated account listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountListResponse {
    pub items: Vec<AccountView>,
    pub total_count: i64,
}

/// Plain message response
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Reinvite response: confirmation plus the refreshed account
#[derive(Debug, Clone, Serialize)]
pub struct ReinviteResponse {
    pub message: String,
    pub account: AccountView,
}

/// Update response: confirmation plus the updated account
#[derive(Debug, Clone, Serialize)]
pub struct UpdatedAccountResponse {
    pub message: String,
    pub item: AccountView,
}
