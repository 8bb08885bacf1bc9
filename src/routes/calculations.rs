use axum::{extract::State, http::StatusCode, Json};

use crate::constants::{ERR_FOREIGN_USER, ERR_NOT_AUTHENTICATED};
use crate::db;
use crate::error::{AppError, Result};
use crate::models::{Calculation, CalculationFilter};
use crate::routes::extract::{AppJson, AppPath, AppQuery, MaybeAuthUser};
use crate::schemas::{CalculationPayload, CalculationQuery};
use crate::AppState;

/// Owner the caller is restricted to; `None` for anonymous pass-through
fn caller_scope(state: &AppState, caller: &MaybeAuthUser) -> Result<Option<i64>> {
    match caller.user_id() {
        Some(user_id) => Ok(Some(user_id)),
        None if state.config.require_auth => {
            Err(AppError::Unauthorized(ERR_NOT_AUTHENTICATED.to_string()))
        }
        None => Ok(None),
    }
}

/// An authenticated caller may only name itself as `user_id`
fn ensure_same_user(scope: Option<i64>, requested: Option<i64>) -> Result<()> {
    match (scope, requested) {
        (Some(caller), Some(requested)) if caller != requested => {
            tracing::warn!("User {} tried to act as user {}", caller, requested);
            Err(AppError::Forbidden(ERR_FOREIGN_USER.to_string()))
        }
        _ => Ok(()),
    }
}

/// GET /calculations
pub async fn browse_calculations(
    State(state): State<AppState>,
    caller: MaybeAuthUser,
    AppQuery(query): AppQuery<CalculationQuery>,
) -> Result<Json<Vec<Calculation>>> {
    let scope = caller_scope(&state, &caller)?;
    ensure_same_user(scope, query.user_id)?;

    let filter = CalculationFilter {
        user_id: scope.or(query.user_id),
    };
    let calculations = db::calculations::list_calculations(&state.pool, &filter).await?;

    Ok(Json(calculations))
}

/// GET /calculations/:id
pub async fn read_calculation(
    State(state): State<AppState>,
    caller: MaybeAuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<Json<Calculation>> {
    let scope = caller_scope(&state, &caller)?;
    let calculation = db::calculations::get_calculation(&state.pool, id, scope).await?;

    Ok(Json(calculation))
}

/// POST /calculations
pub async fn add_calculation(
    State(state): State<AppState>,
    caller: MaybeAuthUser,
    AppJson(payload): AppJson<CalculationPayload>,
) -> Result<(StatusCode, Json<Calculation>)> {
    let scope = caller_scope(&state, &caller)?;
    ensure_same_user(scope, payload.user_id)?;

    let new = payload.into_new(scope)?;
    let calculation = db::calculations::create_calculation(&state.pool, &new).await?;

    tracing::info!(
        "Calculation {} created: {} over {} inputs = {}",
        calculation.id,
        calculation.kind,
        calculation.inputs.len(),
        calculation.result
    );

    Ok((StatusCode::CREATED, Json(calculation)))
}

/// PUT /calculations/:id
pub async fn replace_calculation(
    State(state): State<AppState>,
    caller: MaybeAuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<CalculationPayload>,
) -> Result<Json<Calculation>> {
    let scope = caller_scope(&state, &caller)?;
    ensure_same_user(scope, payload.user_id)?;

    let patch = payload.into_replacement(scope)?;
    let calculation = db::calculations::update_calculation(&state.pool, id, scope, &patch).await?;

    tracing::info!("Calculation {} replaced, result = {}", id, calculation.result);

    Ok(Json(calculation))
}

/// PATCH /calculations/:id
pub async fn edit_calculation(
    State(state): State<AppState>,
    caller: MaybeAuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<CalculationPayload>,
) -> Result<Json<Calculation>> {
    let scope = caller_scope(&state, &caller)?;
    ensure_same_user(scope, payload.user_id)?;

    let patch = payload.into_patch()?;
    let calculation = db::calculations::update_calculation(&state.pool, id, scope, &patch).await?;

    tracing::info!("Calculation {} updated, result = {}", id, calculation.result);

    Ok(Json(calculation))
}

/// DELETE /calculations/:id
pub async fn delete_calculation(
    State(state): State<AppState>,
    caller: MaybeAuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode> {
    let scope = caller_scope(&state, &caller)?;

    db::calculations::delete_calculation(&state.pool, id, scope).await?;

    tracing::info!("Calculation {} deleted", id);

    Ok(StatusCode::NO_CONTENT)
}
