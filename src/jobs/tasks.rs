/// Background task implementations
use crate::{context::AppContext, error::ApiResult};

/// Clear reset/invite token pairs whose expiry has passed
///
/// Expired tokens are already rejected on consumption; clearing keeps the
/// both-set-or-both-unset invariant visible at rest.
pub async fn cleanup_expired_reset_tokens(ctx: &AppContext) -> ApiResult<u64> {
    ctx.account_manager.cleanup_expired_reset_tokens().await
}
