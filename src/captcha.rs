/// Proof-of-humanity verification against an external provider
///
/// The provider is treated as untrusted and bounded-latency: the HTTP client
/// carries a hard timeout, and any rejection or provider failure fails the
/// gated request.
use crate::{
    config::CaptchaConfig,
    error::{ApiError, ApiResult},
};
use serde::Deserialize;
use std::time::Duration;

const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Response shape of the verify endpoint
#[derive(Debug, Deserialize)]
struct VerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Captcha verifier service
#[derive(Clone)]
pub struct CaptchaVerifier {
    config: Option<CaptchaConfig>,
    http: reqwest::Client,
}

impl CaptchaVerifier {
    pub fn new(config: Option<CaptchaConfig>) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(VERIFY_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Internal(format!("Failed to build captcha client: {}", e)))?;

        Ok(Self { config, http })
    }

    /// Verify a captcha proof
    ///
    /// With no provider configured the gate is open (development mode). A
    /// configured provider must answer with success; a missing proof, a
    /// rejection, or an unreachable provider all fail the request.
    pub async fn verify(&self, proof: &str) -> ApiResult<()> {
        let Some(config) = &self.config else {
            tracing::warn!("Captcha not configured, skipping verification");
            return Ok(());
        };

        if proof.is_empty() {
            return Err(ApiError::Captcha("Captcha token is required.".to_string()));
        }

        let response = self
            .http
            .post(&config.verify_url)
            .form(&[("secret", config.secret_key.as_str()), ("response", proof)])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Captcha provider unreachable: {}", e);
                ApiError::Captcha("Error verifying captcha. Please try again later.".to_string())
            })?;

        let body: VerifyResponse = response.json().await.map_err(|e| {
            tracing::warn!("Captcha provider returned a malformed response: {}", e);
            ApiError::Captcha("Error verifying captcha. Please try again later.".to_string())
        })?;

        if !body.success {
            let detail = if body.error_codes.is_empty() {
                "unknown error".to_string()
            } else {
                body.error_codes.join(", ")
            };
            return Err(ApiError::Captcha(format!(
                "Captcha verification failed: {}",
                detail
            )));
        }

        Ok(())
    }

    /// Check if a provider is configured
    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_verifier_passes() {
        let verifier = CaptchaVerifier::new(None).unwrap();
        assert!(!verifier.is_configured());
        assert!(verifier.verify("anything").await.is_ok());
        assert!(verifier.verify("").await.is_ok());
    }

    #[tokio::test]
    async fn configured_verifier_requires_a_proof() {
        let verifier = CaptchaVerifier::new(Some(CaptchaConfig {
            secret_key: "secret".to_string(),
            verify_url: "http://127.0.0.1:9/verify".to_string(),
        }))
        .unwrap();

        match verifier.verify("").await {
            Err(ApiError::Captcha(message)) => assert!(message.contains("required")),
            other => panic!("Expected Captcha error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unreachable_provider_fails_the_request() {
        // Port 9 (discard) is not listening; the send itself fails fast
        let verifier = CaptchaVerifier::new(Some(CaptchaConfig {
            secret_key: "secret".to_string(),
            verify_url: "http://127.0.0.1:9/verify".to_string(),
        }))
        .unwrap();

        assert!(matches!(
            verifier.verify("some-proof").await,
            Err(ApiError::Captcha(_))
        ));
    }
}
