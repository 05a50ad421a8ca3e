/// Account database model
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Parent,
}

/// Account lifecycle status
///
/// `Pending` accounts were invited but have not set a password yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AccountStatus {
    Pending,
    Active,
    Inactive,
    Suspended,
}

/// Capability flags carried by every account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Permissions {
    pub can_create: bool,
    pub can_read: bool,
    pub can_update: bool,
    pub can_delete: bool,
    pub is_global_admin: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        // Read access is granted unless explicitly revoked
        Self {
            can_create: false,
            can_read: true,
            can_update: false,
            can_delete: false,
            is_global_admin: false,
        }
    }
}

/// Account record in the database
///
/// `reset_token` and `reset_token_expires_at` are either both present or
/// both absent; every write path sets or clears them together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    pub name: String,
    pub phone_number: String,
    pub permissions: Permissions,
    pub reset_token: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column list matching `Account::from_row`
pub const ACCOUNT_COLUMNS: &str = "id, email, password_hash, role, status, name, phone_number, \
     can_create, can_read, can_update, can_delete, is_global_admin, \
     reset_token, reset_token_expires_at, created_at, updated_at";

impl Account {
    /// Map a row selected with `ACCOUNT_COLUMNS` into an `Account`
    pub fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Account {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: row.try_get("role")?,
            status: row.try_get("status")?,
            name: row.try_get("name")?,
            phone_number: row.try_get("phone_number")?,
            permissions: Permissions {
                can_create: row.try_get("can_create")?,
                can_read: row.try_get("can_read")?,
                can_update: row.try_get("can_update")?,
                can_delete: row.try_get("can_delete")?,
                is_global_admin: row.try_get("is_global_admin")?,
            },
            reset_token: row.try_get("reset_token")?,
            reset_token_expires_at: row.try_get("reset_token_expires_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_permissions_grant_read_only() {
        let permissions = Permissions::default();
        assert!(permissions.can_read);
        assert!(!permissions.can_create);
        assert!(!permissions.can_update);
        assert!(!permissions.can_delete);
        assert!(!permissions.is_global_admin);
    }

    #[test]
    fn permissions_deserialize_with_camel_case_and_defaults() {
        let permissions: Permissions =
            serde_json::from_str(r#"{"canCreate": true}"#).unwrap();
        assert!(permissions.can_create);
        // Unspecified flags fall back to the defaults
        assert!(permissions.can_read);
        assert!(!permissions.can_delete);
    }
}
