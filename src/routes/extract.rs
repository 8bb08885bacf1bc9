use axum::{
    async_trait,
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Request,
    },
    http::{header, request::Parts},
};
use serde::de::DeserializeOwned;

use crate::constants::{ERR_COULD_NOT_VALIDATE, ERR_INACTIVE_USER, ERR_NOT_AUTHENTICATED};
use crate::db;
use crate::error::{AppError, Result};
use crate::security::{TokenClaims, TokenError, TokenType};
use crate::AppState;

/// `axum::Json` whose rejection is an [`AppError`] (422 with a JSON body)
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// `axum::extract::Path` with an [`AppError`] rejection
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// `axum::extract::Query` with an [`AppError`] rejection
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// JSON body that may be left out entirely
///
/// An empty (or all-whitespace) body yields `None`. Any other body must parse
/// as `T`, otherwise the request fails with 422 like [`AppJson`].
#[derive(Debug)]
pub struct OptionalJson<T>(pub Option<T>);

#[async_trait]
impl<S, T> FromRequest<S> for OptionalJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalJson(None));
        }

        let axum::Json(value) = axum::Json::<T>::from_bytes(&bytes)?;
        Ok(OptionalJson(Some(value)))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Caller authenticated by a valid, unrevoked access token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub claims: TokenClaims,
}

/// Optional authentication: no header means anonymous, a bad token is still 401
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    pub fn user_id(&self) -> Option<i64> {
        self.0.as_ref().map(|user| user.user_id)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = bearer_token(parts)?
            .ok_or_else(|| AppError::Unauthorized(ERR_NOT_AUTHENTICATED.to_string()))?;
        authenticate(state, &token).await
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        match bearer_token(parts)? {
            Some(token) => Ok(MaybeAuthUser(Some(authenticate(state, &token).await?))),
            None => Ok(MaybeAuthUser(None)),
        }
    }
}

/// Token from `Authorization: Bearer <token>`; `None` when the header is absent
fn bearer_token(parts: &Parts) -> Result<Option<String>> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let malformed = || AppError::Unauthorized(ERR_NOT_AUTHENTICATED.to_string());
    let value = value.to_str().map_err(|_| malformed())?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(Some(token.trim().to_string()))
        }
        _ => Err(malformed()),
    }
}

async fn authenticate(state: &AppState, token: &str) -> Result<AuthUser> {
    let claims = state.tokens.validate(token, TokenType::Access).map_err(|e| {
        tracing::warn!("Rejected access token: {}", e);
        e
    })?;

    if db::tokens::is_token_revoked(&state.pool, &claims.jti).await? {
        tracing::warn!("Revoked access token presented");
        return Err(TokenError::Revoked.into());
    }

    let user_id = claims.user_id()?;
    let Some(user) = db::users::find_user_by_id(&state.pool, user_id).await? else {
        tracing::warn!("Access token for unknown user {}", user_id);
        return Err(AppError::Unauthorized(ERR_COULD_NOT_VALIDATE.to_string()));
    };

    if !user.is_active {
        tracing::warn!("Access token for inactive user {}", user_id);
        return Err(AppError::Unauthorized(ERR_INACTIVE_USER.to_string()));
    }

    Ok(AuthUser { user_id, claims })
}
