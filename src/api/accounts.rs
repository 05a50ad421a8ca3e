/// Account endpoints: authentication, token lifecycle, and administration
use crate::{
    account::{
        AccountListResponse, AccountView, ConsumeTokenRequest, ForgotPasswordRequest,
        InviteAccountRequest, ListAccountsQuery, MessageResponse, ReinviteResponse,
        SessionResponse, SignInRequest, SignUpRequest, UpdateAccountRequest,
        UpdatedAccountResponse, RESET_REQUEST_MESSAGE,
    },
    auth::{require_admin, require_capability, AuthContext, Capability},
    context::AppContext,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use validator::Validate;

/// Build account routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/v1/accounts/signin", post(sign_in))
        .route("/v1/accounts/signup", post(sign_up))
        .route("/v1/accounts/forgot-password", post(forgot_password))
        .route("/v1/accounts/reset-password", put(reset_password))
        .route("/v1/accounts/invite", post(invite_account))
        .route("/v1/accounts/set-password", put(set_password))
        .route("/v1/accounts/:account_id/reinvite", post(reinvite_account))
        .route("/v1/accounts/me", get(get_own_account))
        .route("/v1/accounts", get(list_accounts))
        .route(
            "/v1/accounts/:account_id",
            put(update_account).delete(delete_account),
        )
}

fn validated<T: Validate>(request: &T) -> ApiResult<()> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))
}

/// Sign-in endpoint
async fn sign_in(
    State(ctx): State<AppContext>,
    Json(req): Json<SignInRequest>,
) -> ApiResult<Json<SessionResponse>> {
    validated(&req)?;

    let (account, token) = ctx.account_manager.sign_in(&req.email, &req.password).await?;

    Ok(Json(SessionResponse {
        account: AccountView::from(&account),
        token,
    }))
}

/// Self-service signup endpoint
async fn sign_up(
    State(ctx): State<AppContext>,
    Json(req): Json<SignUpRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    validated(&req)?;

    let (account, token) = ctx
        .account_manager
        .sign_up(
            &req.email,
            &req.password,
            req.role,
            req.permissions,
            &req.name,
            &req.phone_number,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            account: AccountView::from(&account),
            token,
        }),
    ))
}

/// Password reset request endpoint (public)
///
/// Always answers with the same generic message, so the endpoint cannot be
/// used to probe which addresses are registered.
async fn forgot_password(
    State(ctx): State<AppContext>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    validated(&req)?;

    ctx.captcha.verify(&req.captcha_token).await?;

    if let Some((account, token)) = ctx.account_manager.request_password_reset(&req.email).await? {
        // The token is already persisted; a failed send must not fail the
        // request or discard it.
        if let Err(e) = ctx
            .mailer
            .send_password_reset_email(&account.email, &account.name, &token, ctx.frontend_url())
            .await
        {
            tracing::warn!("Failed to send password reset email: {}", e);
        }
    }

    Ok(Json(MessageResponse {
        message: RESET_REQUEST_MESSAGE.to_string(),
    }))
}

/// Password reset consumption endpoint (public)
async fn reset_password(
    State(ctx): State<AppContext>,
    Json(req): Json<ConsumeTokenRequest>,
) -> ApiResult<Json<MessageResponse>> {
    validated(&req)?;

    ctx.account_manager
        .reset_password(&req.token, &req.password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password has been reset successfully.".to_string(),
    }))
}

/// Invitation endpoint
///
/// Requires the admin role and the create capability.
async fn invite_account(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<InviteAccountRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    validated(&req)?;

    let requester = ctx.account_manager.get_account(&auth.account_id).await?;
    require_admin(&requester)?;
    require_capability(&requester, Capability::Create)?;

    let (account, token) = ctx
        .account_manager
        .invite_account(
            &req.name,
            &req.email,
            req.role,
            req.permissions,
            &req.phone_number,
        )
        .await?;

    let inviter = if requester.name.is_empty() {
        requester.email.clone()
    } else {
        requester.name.clone()
    };
    if let Err(e) = ctx
        .mailer
        .send_invitation_email(
            &account.email,
            &account.name,
            &inviter,
            &token,
            ctx.frontend_url(),
            false,
        )
        .await
    {
        tracing::warn!("Failed to send invitation email: {}", e);
    }

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Account invited successfully.".to_string(),
        }),
    ))
}

/// Set-password endpoint (public), consuming an invite or reset token
async fn set_password(
    State(ctx): State<AppContext>,
    Json(req): Json<ConsumeTokenRequest>,
) -> ApiResult<Json<MessageResponse>> {
    validated(&req)?;

    ctx.account_manager
        .set_password(&req.token, &req.password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password set successfully. Your account is now active.".to_string(),
    }))
}

/// Reinvitation endpoint
async fn reinvite_account(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(account_id): Path<String>,
) -> ApiResult<Json<ReinviteResponse>> {
    let requester = ctx.account_manager.get_account(&auth.account_id).await?;
    require_admin(&requester)?;

    let (account, token) = ctx.account_manager.reinvite_account(&account_id).await?;

    let inviter = if requester.name.is_empty() {
        requester.email.clone()
    } else {
        requester.name.clone()
    };
    if let Err(e) = ctx
        .mailer
        .send_invitation_email(
            &account.email,
            &account.name,
            &inviter,
            &token,
            ctx.frontend_url(),
            true,
        )
        .await
    {
        tracing::warn!("Failed to send reinvitation email: {}", e);
    }

    Ok(Json(ReinviteResponse {
        message: "Account reinvited successfully.".to_string(),
        account: AccountView::from(&account),
    }))
}

/// Own-account endpoint
async fn get_own_account(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ApiResult<Json<AccountView>> {
    let account = ctx.account_manager.get_account(&auth.account_id).await?;

    Ok(Json(AccountView::from(&account)))
}

/// Account listing endpoint, admin-gated
async fn list_accounts(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(query): Query<ListAccountsQuery>,
) -> ApiResult<Json<AccountListResponse>> {
    let requester = ctx.account_manager.get_account(&auth.account_id).await?;
    require_admin(&requester)?;

    let (accounts, total_count) = ctx.account_manager.list_accounts(&query).await?;

    Ok(Json(AccountListResponse {
        items: accounts.iter().map(AccountView::from).collect(),
        total_count,
    }))
}

/// Account detail update endpoint
async fn update_account(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(account_id): Path<String>,
    Json(req): Json<UpdateAccountRequest>,
) -> ApiResult<Json<UpdatedAccountResponse>> {
    validated(&req)?;

    let requester = ctx.account_manager.get_account(&auth.account_id).await?;
    require_capability(&requester, Capability::Update)?;

    let account = ctx.account_manager.update_account(&account_id, &req).await?;

    Ok(Json(UpdatedAccountResponse {
        message: "Account updated successfully.".to_string(),
        item: AccountView::from(&account),
    }))
}

/// Account deletion endpoint
async fn delete_account(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(account_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let requester = ctx.account_manager.get_account(&auth.account_id).await?;
    require_admin(&requester)?;
    require_capability(&requester, Capability::Delete)?;

    ctx.account_manager.delete_account(&account_id).await?;

    Ok(Json(MessageResponse {
        message: "Account deleted successfully.".to_string(),
    }))
}
