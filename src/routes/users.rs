use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::constants::{
    BEARER_TOKEN_TYPE, ERR_COULD_NOT_VALIDATE, ERR_INACTIVE_USER, ERR_INVALID_CREDENTIALS,
};
use crate::db;
use crate::error::{AppError, Result};
use crate::models::{NewUser, User};
use crate::routes::extract::{AppJson, AuthUser, OptionalJson};
use crate::schemas::{LoginRequest, LogoutRequest, RefreshRequest, RegisterRequest};
use crate::security::{
    hash_password, verify_password, verify_password_unknown_user, TokenError, TokenType,
};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Expiry of the access token
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

fn ensure_active(user: &User) -> Result<()> {
    if !user.is_active {
        tracing::warn!("Rejected inactive user {}", user.id);
        return Err(AppError::Unauthorized(ERR_INACTIVE_USER.to_string()));
    }
    Ok(())
}

fn issue_token_pair(state: &AppState, user: User) -> Result<TokenResponse> {
    let access = state.tokens.issue(user.id, TokenType::Access)?;
    let refresh = state.tokens.issue(user.id, TokenType::Refresh)?;

    Ok(TokenResponse {
        access_token: access.token,
        refresh_token: refresh.token,
        token_type: BEARER_TOKEN_TYPE,
        expires_at: access.expires_at,
        user,
    })
}

/// Register a new user
///
/// The password is hashed with Argon2id on the blocking pool; only the hash
/// is stored. Returns 409 Conflict if the username or email is taken.
pub async fn register_user(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let registration = payload.validate()?;

    let password = registration.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;

    let user = db::users::create_user(
        &state.pool,
        &NewUser {
            username: registration.username,
            email: registration.email,
            first_name: registration.first_name,
            last_name: registration.last_name,
            password_hash,
        },
    )
    .await?;

    tracing::info!("New user registered: id={}", user.id);

    Ok((StatusCode::CREATED, Json(user)))
}

/// Verify credentials and issue an access/refresh token pair
///
/// Unknown username and wrong password produce the same 401, and both pay
/// for one Argon2 verification. Deactivated accounts are refused after the
/// password has been checked.
pub async fn login_user(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let (username, password) = payload.validate()?;

    let user = db::users::find_user_by_username(&state.pool, &username).await?;

    let stored_hash = user.as_ref().map(|user| user.password_hash.clone());
    let verified = tokio::task::spawn_blocking(move || match stored_hash {
        Some(hash) => verify_password(&password, &hash),
        None => verify_password_unknown_user(&password),
    })
    .await?;

    let user = match user {
        Some(user) if verified => user,
        Some(user) => {
            tracing::warn!("Login failed: wrong password for user {}", user.id);
            return Err(AppError::Unauthorized(ERR_INVALID_CREDENTIALS.to_string()));
        }
        None => {
            tracing::warn!("Login failed: unknown user");
            return Err(AppError::Unauthorized(ERR_INVALID_CREDENTIALS.to_string()));
        }
    };
    ensure_active(&user)?;

    tracing::info!("User {} logged in", user.id);

    Ok(Json(issue_token_pair(&state, user)?))
}

/// Exchange a refresh token for a new pair
///
/// The presented token is revoked before the new pair is signed; revoking is
/// an atomic claim, so each refresh token is accepted at most once even under
/// concurrent use.
pub async fn refresh_token(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> Result<Json<TokenResponse>> {
    let claims = state
        .tokens
        .validate(&payload.refresh_token, TokenType::Refresh)?;

    let user = db::users::find_user_by_id(&state.pool, claims.user_id()?)
        .await?
        .ok_or_else(|| AppError::Unauthorized(ERR_COULD_NOT_VALIDATE.to_string()))?;
    ensure_active(&user)?;

    if !db::tokens::revoke_token(&state.pool, &claims.jti, claims.expires_at()).await? {
        tracing::warn!("Revoked refresh token presented for user {}", user.id);
        return Err(TokenError::Revoked.into());
    }

    tracing::info!("Tokens refreshed for user {}", user.id);

    Ok(Json(issue_token_pair(&state, user)?))
}

/// Revoke the presented access token and, if given, a refresh token
///
/// The body is optional; if one is sent it must be a valid logout request.
pub async fn logout_user(
    State(state): State<AppState>,
    caller: AuthUser,
    OptionalJson(body): OptionalJson<LogoutRequest>,
) -> Result<StatusCode> {
    let refresh = body.and_then(|request| request.refresh_token);

    if let Some(refresh) = refresh {
        let claims = state.tokens.validate(&refresh, TokenType::Refresh)?;
        if claims.user_id()? != caller.user_id {
            tracing::warn!("User {} tried to revoke a foreign refresh token", caller.user_id);
            return Err(TokenError::Invalid.into());
        }
        db::tokens::revoke_token(&state.pool, &claims.jti, claims.expires_at()).await?;
    }

    db::tokens::revoke_token(&state.pool, &caller.claims.jti, caller.claims.expires_at()).await?;

    tracing::info!("User {} logged out", caller.user_id);

    Ok(StatusCode::NO_CONTENT)
}

/// Current user behind the bearer token
pub async fn current_user(State(state): State<AppState>, caller: AuthUser) -> Result<Json<User>> {
    let user = db::users::find_user_by_id(&state.pool, caller.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized(ERR_COULD_NOT_VALIDATE.to_string()))?;

    Ok(Json(user))
}
