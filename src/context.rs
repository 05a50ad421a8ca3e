/// Application context and dependency injection
use crate::{
    account::AccountManager,
    captcha::CaptchaVerifier,
    config::ServerConfig,
    db,
    error::ApiResult,
    mailer::Mailer,
    token::TokenSigner,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub signer: TokenSigner,
    pub account_manager: Arc<AccountManager>,
    pub mailer: Arc<Mailer>,
    pub captcha: Arc<CaptchaVerifier>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let pool = db::create_pool(&config.storage.account_db, db::DatabaseOptions::default())
            .await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        let signer = TokenSigner::new(
            config.authentication.session_secret.clone(),
            config.authentication.reset_secret.clone(),
        );
        let account_manager = Arc::new(AccountManager::new(pool.clone(), signer.clone()));
        let mailer = Arc::new(Mailer::new(config.email.clone())?);
        let captcha = Arc::new(CaptchaVerifier::new(config.captcha.clone())?);

        Ok(Self {
            config: Arc::new(config),
            db: pool,
            signer,
            account_manager,
            mailer,
            captcha,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> ApiResult<()> {
        if !config.storage.data_directory.exists() {
            tokio::fs::create_dir_all(&config.storage.data_directory).await?;
        }
        Ok(())
    }

    /// Base URL of the web frontend, used in reset and invitation links
    pub fn frontend_url(&self) -> &str {
        &self.config.service.frontend_url
    }
}
