/// Account manager: the credential and token lifecycle
///
/// Owns password hashing and verification, session issuance, and the
/// reset/invitation token flows, using sqlx runtime queries against the
/// account store. Token consumption always ends in a conditional update so
/// a token is single-use even under concurrent presentation.
use crate::{
    account::{ListAccountsQuery, UpdateAccountRequest},
    db::account::{Account, AccountStatus, Permissions, Role, ACCOUNT_COLUMNS},
    error::{ApiError, ApiResult},
    token::TokenSigner,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    signer: TokenSigner,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, signer: TokenSigner) -> Self {
        Self { db, signer }
    }

    // ==================== Password hashing ====================

    fn hash_password(password: &str) -> ApiResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
    }

    fn verify_password(password: &str, hash: &str) -> bool {
        PasswordHash::new(hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    // ==================== Authentication ====================

    /// Authenticate by email and password, returning the account and a
    /// one-hour session token.
    ///
    /// Unknown email, missing password hash (pending account), and wrong
    /// password all fail with the same `InvalidCredentials`.
    pub async fn sign_in(&self, email: &str, password: &str) -> ApiResult<(Account, String)> {
        let account = self
            .find_by_email(email)
            .await?
            .ok_or(ApiError::InvalidCredentials)?;

        let hash = account
            .password_hash
            .as_deref()
            .ok_or(ApiError::InvalidCredentials)?;

        if !Self::verify_password(password, hash) {
            return Err(ApiError::InvalidCredentials);
        }

        let token = self.signer.sign_session(&account.id, &account.email)?;

        Ok((account, token))
    }

    /// Self-service signup: the account is active immediately
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        role: Role,
        permissions: Option<Permissions>,
        name: &str,
        phone_number: &str,
    ) -> ApiResult<(Account, String)> {
        // Pre-check for a friendlier error; the UNIQUE constraint on email
        // is the enforcement under concurrent signups.
        if self.find_by_email(email).await?.is_some() {
            return Err(ApiError::DuplicateAccount);
        }

        let password_hash = Self::hash_password(password)?;

        let account = self
            .insert_account(
                email,
                Some(password_hash),
                role,
                AccountStatus::Active,
                permissions.unwrap_or_default(),
                name,
                phone_number,
            )
            .await?;

        let token = self.signer.sign_session(&account.id, &account.email)?;

        Ok((account, token))
    }

    // ==================== Password reset flow ====================

    /// Issue a reset token for the account with this email, if one exists
    ///
    /// Returns `None` when no account matches; callers answer with the same
    /// generic success either way so the endpoint cannot be used to probe
    /// which addresses are registered. The token is persisted here, before
    /// any email is attempted.
    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> ApiResult<Option<(Account, String)>> {
        let Some(account) = self.find_by_email(email).await? else {
            return Ok(None);
        };

        let token = self.signer.sign_reset(&account.id, Duration::hours(1))?;
        self.store_reset_token(&account.id, &token, Utc::now() + Duration::hours(1))
            .await?;

        Ok(Some((account, token)))
    }

    /// Consume a reset token and store the new password
    pub async fn reset_password(&self, token: &str, new_password: &str) -> ApiResult<Account> {
        // First check: store lookup by exact token match with an unexpired
        // timestamp.
        let sql = format!(
            "SELECT {} FROM accounts WHERE reset_token = ?1 AND reset_token_expires_at > ?2",
            ACCOUNT_COLUMNS
        );
        let account = sqlx::query(&sql)
            .bind(token)
            .bind(Utc::now())
            .fetch_optional(&self.db)
            .await?
            .ok_or(ApiError::InvalidOrExpiredToken)?;
        let account = Account::from_row(&account)?;

        // Second check: signature and expiry of the token itself, and the
        // signed account-id claim must match the account holding the token.
        let claims = self.signer.verify_reset(token)?;
        if claims.sub != account.id {
            return Err(ApiError::TokenMismatch);
        }

        let password_hash = Self::hash_password(new_password)?;
        self.consume_reset_token(&account.id, token, &password_hash, account.status)
            .await?;

        self.get_account(&account.id).await
    }

    // ==================== Invitation flow ====================

    /// Create a pending account and issue a 48-hour invite token
    ///
    /// Permission defaults for invited accounts grant read access only,
    /// unless the caller overrides them.
    pub async fn invite_account(
        &self,
        name: &str,
        email: &str,
        role: Role,
        permissions: Option<Permissions>,
        phone_number: &str,
    ) -> ApiResult<(Account, String)> {
        if self.find_by_email(email).await?.is_some() {
            return Err(ApiError::DuplicateAccount);
        }

        let account = self
            .insert_account(
                email,
                None,
                role,
                AccountStatus::Pending,
                permissions.unwrap_or_default(),
                name,
                phone_number,
            )
            .await?;

        let token = self.issue_invite_token(&account.id).await?;

        Ok((account, token))
    }

    /// Consume an invite or reset token presented on the set-password
    /// endpoint
    ///
    /// Unlike `reset_password` this starts from the signed claim, so it can
    /// tell an already-consumed token apart from a bogus one and reject the
    /// replay explicitly.
    pub async fn set_password(&self, token: &str, new_password: &str) -> ApiResult<Account> {
        let claims = self.signer.verify_reset(token)?;

        let account = self
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| ApiError::NotFound("Account not found.".to_string()))?;

        let now = Utc::now();
        let stored_matches = account.reset_token.as_deref() == Some(token);
        let stored_live = account
            .reset_token_expires_at
            .map(|expires_at| expires_at > now)
            .unwrap_or(false);

        // Replay after a legitimate set: the account is already active with
        // a password and this token has been cleared or has lapsed.
        if account.status == AccountStatus::Active
            && account.password_hash.is_some()
            && (!stored_matches || !stored_live)
        {
            return Err(ApiError::AlreadySet);
        }

        if !stored_matches || !stored_live {
            return Err(ApiError::InvalidOrExpiredToken);
        }

        let password_hash = Self::hash_password(new_password)?;
        self.consume_reset_token(&account.id, token, &password_hash, AccountStatus::Active)
            .await?;

        self.get_account(&account.id).await
    }

    /// Reissue an invite token for a pending account
    pub async fn reinvite_account(&self, account_id: &str) -> ApiResult<(Account, String)> {
        let account = self.get_account(account_id).await?;

        if account.status != AccountStatus::Pending {
            return Err(ApiError::InvalidState(
                "Only pending accounts can be reinvited.".to_string(),
            ));
        }

        let token = self.issue_invite_token(&account.id).await?;

        Ok((account, token))
    }

    async fn issue_invite_token(&self, account_id: &str) -> ApiResult<String> {
        let token = self.signer.sign_reset(account_id, Duration::hours(48))?;
        self.store_reset_token(account_id, &token, Utc::now() + Duration::hours(48))
            .await?;
        Ok(token)
    }

    // ==================== Token persistence ====================

    /// Store a token pair on the account, overwriting any prior pair
    async fn store_reset_token(
        &self,
        account_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> ApiResult<()> {
        sqlx::query(
            "UPDATE accounts
             SET reset_token = ?1, reset_token_expires_at = ?2, updated_at = ?3
             WHERE id = ?4",
        )
        .bind(token)
        .bind(expires_at)
        .bind(Utc::now())
        .bind(account_id)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Set the new password and clear the token pair in one statement,
    /// conditional on the stored token still equaling the presented one.
    /// Under two concurrent consumptions only one caller's write lands; the
    /// other sees zero rows affected.
    async fn consume_reset_token(
        &self,
        account_id: &str,
        token: &str,
        password_hash: &str,
        status: AccountStatus,
    ) -> ApiResult<()> {
        let result = sqlx::query(
            "UPDATE accounts
             SET password_hash = ?1, reset_token = NULL, reset_token_expires_at = NULL,
                 status = ?2, updated_at = ?3
             WHERE id = ?4 AND reset_token = ?5",
        )
        .bind(password_hash)
        .bind(status)
        .bind(Utc::now())
        .bind(account_id)
        .bind(token)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::InvalidOrExpiredToken);
        }

        Ok(())
    }

    /// Clear token pairs whose expiry has passed
    ///
    /// Consumption already rejects expired tokens; this keeps rows tidy at
    /// rest. Called hourly by the job scheduler.
    pub async fn cleanup_expired_reset_tokens(&self) -> ApiResult<u64> {
        let result = sqlx::query(
            "UPDATE accounts
             SET reset_token = NULL, reset_token_expires_at = NULL
             WHERE reset_token IS NOT NULL AND reset_token_expires_at <= ?1",
        )
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    // ==================== Store access ====================

    /// Find account by exact email match
    pub async fn find_by_email(&self, email: &str) -> ApiResult<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE email = ?1", ACCOUNT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;

        row.map(|row| Account::from_row(&row))
            .transpose()
            .map_err(ApiError::Database)
    }

    /// Find account by id
    pub async fn find_by_id(&self, account_id: &str) -> ApiResult<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE id = ?1", ACCOUNT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(account_id)
            .fetch_optional(&self.db)
            .await?;

        row.map(|row| Account::from_row(&row))
            .transpose()
            .map_err(ApiError::Database)
    }

    /// Get account by id, failing with NotFound if missing
    pub async fn get_account(&self, account_id: &str) -> ApiResult<Account> {
        self.find_by_id(account_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Account not found.".to_string()))
    }

    async fn insert_account(
        &self,
        email: &str,
        password_hash: Option<String>,
        role: Role,
        status: AccountStatus,
        permissions: Permissions,
        name: &str,
        phone_number: &str,
    ) -> ApiResult<Account> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO accounts (id, email, password_hash, role, status, name, phone_number,
                    can_create, can_read, can_update, can_delete, is_global_admin,
                    created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .bind(&id)
        .bind(email)
        .bind(&password_hash)
        .bind(role)
        .bind(status)
        .bind(name)
        .bind(phone_number)
        .bind(permissions.can_create)
        .bind(permissions.can_read)
        .bind(permissions.can_update)
        .bind(permissions.can_delete)
        .bind(permissions.is_global_admin)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| match &e {
            // The constraint, not the pre-check, is what enforces uniqueness
            sqlx::Error::Database(db) if db.is_unique_violation() => ApiError::DuplicateAccount,
            _ => ApiError::Database(e),
        })?;

        Ok(Account {
            id,
            email: email.to_string(),
            password_hash,
            role,
            status,
            name: name.to_string(),
            phone_number: phone_number.to_string(),
            permissions,
            reset_token: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    // ==================== Administration ====================

    /// List accounts with pagination and optional search/role/status filters
    ///
    /// Ordered newest first. Returns the page of accounts plus the total
    /// count matching the filters.
    pub async fn list_accounts(
        &self,
        query: &ListAccountsQuery,
    ) -> ApiResult<(Vec<Account>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(100).clamp(1, 500);
        let offset = (page - 1) * limit;

        fn push_filters(builder: &mut QueryBuilder<Sqlite>, query: &ListAccountsQuery) {
            let mut separator = " WHERE ";
            if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
                let pattern = format!("%{}%", search);
                builder
                    .push(separator)
                    .push("(name LIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR email LIKE ")
                    .push_bind(pattern)
                    .push(")");
                separator = " AND ";
            }
            if let Some(role) = query.role {
                builder.push(separator).push("role = ").push_bind(role);
                separator = " AND ";
            }
            if let Some(status) = query.status {
                builder.push(separator).push("status = ").push_bind(status);
            }
        }

        let total: i64 = {
            let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM accounts");
            push_filters(&mut builder, query);
            builder.build_query_scalar().fetch_one(&self.db).await?
        };

        let rows = {
            let mut builder =
                QueryBuilder::new(format!("SELECT {} FROM accounts", ACCOUNT_COLUMNS));
            push_filters(&mut builder, query);
            builder
                .push(" ORDER BY created_at DESC LIMIT ")
                .push_bind(limit as i64)
                .push(" OFFSET ")
                .push_bind(offset as i64);
            builder.build().fetch_all(&self.db).await?
        };

        let accounts = rows
            .iter()
            .map(Account::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((accounts, total))
    }

    /// Update account details (name, email, role, permissions, phone)
    pub async fn update_account(
        &self,
        account_id: &str,
        update: &UpdateAccountRequest,
    ) -> ApiResult<Account> {
        // Surface a NotFound before attempting the write
        let account = self.get_account(account_id).await?;

        sqlx::query(
            "UPDATE accounts
             SET name = ?1, email = ?2, role = ?3, phone_number = ?4,
                 can_create = ?5, can_read = ?6, can_update = ?7, can_delete = ?8,
                 is_global_admin = ?9, updated_at = ?10
             WHERE id = ?11",
        )
        .bind(&update.name)
        .bind(&update.email)
        .bind(update.role)
        .bind(&update.phone_number)
        .bind(update.permissions.can_create)
        .bind(update.permissions.can_read)
        .bind(update.permissions.can_update)
        .bind(update.permissions.can_delete)
        .bind(update.permissions.is_global_admin)
        .bind(Utc::now())
        .bind(&account.id)
        .execute(&self.db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => ApiError::DuplicateAccount,
            _ => ApiError::Database(e),
        })?;

        self.get_account(&account.id).await
    }

    /// Delete an account
    pub async fn delete_account(&self, account_id: &str) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = ?1")
            .bind(account_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Account not found.".to_string()));
        }

        Ok(())
    }
}
