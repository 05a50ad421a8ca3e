/// Configuration management for the Schoolhub account service
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub email: Option<EmailConfig>,
    pub captcha: Option<CaptchaConfig>,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Base URL of the web frontend; reset and invitation links point here
    pub frontend_url: String,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub account_db: PathBuf,
}

/// Authentication configuration
///
/// Two separate signing secrets: session tokens prove a completed sign-in,
/// reset tokens gate password reset and invitation acceptance. A leaked
/// session secret must not allow forging reset links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub session_secret: String,
    pub reset_secret: String,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Captcha verification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptchaConfig {
    pub secret_key: String,
    pub verify_url: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ApiResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("SCHOOLHUB_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("SCHOOLHUB_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ApiError::Validation("Invalid port number".to_string()))?;

        let frontend_url = env::var("SCHOOLHUB_FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let version = env::var("SCHOOLHUB_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

        let data_directory: PathBuf = env::var("SCHOOLHUB_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let account_db = env::var("SCHOOLHUB_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("accounts.sqlite"));

        let session_secret = env::var("SCHOOLHUB_SESSION_SECRET")
            .map_err(|_| ApiError::Validation("Session secret required".to_string()))?;
        let reset_secret = env::var("SCHOOLHUB_RESET_SECRET")
            .map_err(|_| ApiError::Validation("Reset secret required".to_string()))?;

        let email = if let Ok(smtp_url) = env::var("SCHOOLHUB_EMAIL_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("SCHOOLHUB_EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| format!("noreply@{}", hostname)),
            })
        } else {
            None
        };

        let captcha = if let Ok(secret_key) = env::var("SCHOOLHUB_CAPTCHA_SECRET") {
            Some(CaptchaConfig {
                secret_key,
                verify_url: env::var("SCHOOLHUB_CAPTCHA_VERIFY_URL").unwrap_or_else(|_| {
                    "https://www.google.com/recaptcha/api/siteverify".to_string()
                }),
            })
        } else {
            None
        };

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                frontend_url,
                version,
            },
            storage: StorageConfig {
                data_directory,
                account_db,
            },
            authentication: AuthConfig {
                session_secret,
                reset_secret,
            },
            email,
            captcha,
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ApiError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.session_secret.len() < 32 {
            return Err(ApiError::Validation(
                "Session secret must be at least 32 characters".to_string(),
            ));
        }

        if self.authentication.reset_secret.len() < 32 {
            return Err(ApiError::Validation(
                "Reset secret must be at least 32 characters".to_string(),
            ));
        }

        if self.authentication.session_secret == self.authentication.reset_secret {
            return Err(ApiError::Validation(
                "Session and reset secrets must differ".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 8080,
                frontend_url: "http://localhost:3000".to_string(),
                version: "0.1.0".to_string(),
            },
            storage: StorageConfig {
                data_directory: PathBuf::from("./data"),
                account_db: PathBuf::from(":memory:"),
            },
            authentication: AuthConfig {
                session_secret: "session-secret-0123456789-0123456789".to_string(),
                reset_secret: "reset-secret-0123456789-0123456789-x".to_string(),
            },
            email: None,
            captcha: None,
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn short_secret_rejected() {
        let mut config = test_config();
        config.authentication.session_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn identical_secrets_rejected() {
        let mut config = test_config();
        config.authentication.reset_secret = config.authentication.session_secret.clone();
        assert!(config.validate().is_err());
    }
}
