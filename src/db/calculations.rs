use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::calculator::evaluate;
use crate::constants::ERR_CALCULATION_NOT_FOUND;
use crate::db::users::user_exists;
use crate::error::{AppError, Result};
use crate::models::{
    Calculation, CalculationFilter, CalculationPatch, CalculationRow, NewCalculation,
};

fn not_found() -> AppError {
    AppError::NotFound(ERR_CALCULATION_NOT_FOUND.to_string())
}

fn unknown_user(user_id: i64) -> AppError {
    AppError::Validation(format!("User {} does not exist", user_id))
}

/// Map a foreign key failure (owner deleted between check and write) to a client error
fn map_write_error(err: sqlx::Error, user_id: i64) -> AppError {
    match err {
        sqlx::Error::Database(ref e) if e.is_foreign_key_violation() => unknown_user(user_id),
        other => other.into(),
    }
}

/// Add: evaluate and insert
///
/// # Arguments
/// * `pool` - Database pool
/// * `new` - Validated kind, owner and inputs
///
/// # Returns
/// * The stored row, with `result` computed here from `kind` and `inputs`
///
/// # Errors
/// * `AppError::Calculation` if the engine rejects the inputs (nothing is written)
/// * `AppError::Validation` if `user_id` names no existing user
/// * `AppError::Database` for storage failures
pub async fn create_calculation(pool: &SqlitePool, new: &NewCalculation) -> Result<Calculation> {
    let result = evaluate(new.kind, &new.inputs)?;

    if !user_exists(pool, new.user_id).await? {
        return Err(unknown_user(new.user_id));
    }

    let now = Utc::now();
    let row = sqlx::query_as::<_, CalculationRow>(
        r#"INSERT INTO calculations (type, user_id, inputs, result, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?)
           RETURNING id, type, user_id, inputs, result, created_at, updated_at"#,
    )
    .bind(new.kind.as_str())
    .bind(new.user_id)
    .bind(Json(&new.inputs))
    .bind(result)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|e| map_write_error(e, new.user_id))?;

    row.try_into()
}

/// Browse in insertion order, optionally restricted to one owner
pub async fn list_calculations(
    pool: &SqlitePool,
    filter: &CalculationFilter,
) -> Result<Vec<Calculation>> {
    let rows = sqlx::query_as::<_, CalculationRow>(
        r#"SELECT id, type, user_id, inputs, result, created_at, updated_at
           FROM calculations
           WHERE (? IS NULL OR user_id = ?)
           ORDER BY id ASC"#,
    )
    .bind(filter.user_id)
    .bind(filter.user_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Calculation::try_from).collect()
}

/// Read
///
/// With `owner` set, rows of other users are reported as not found.
pub async fn get_calculation(pool: &SqlitePool, id: i64, owner: Option<i64>) -> Result<Calculation> {
    sqlx::query_as::<_, CalculationRow>(
        r#"SELECT id, type, user_id, inputs, result, created_at, updated_at
           FROM calculations
           WHERE id = ? AND (? IS NULL OR user_id = ?)"#,
    )
    .bind(id)
    .bind(owner)
    .bind(owner)
    .fetch_optional(pool)
    .await?
    .ok_or_else(not_found)?
    .try_into()
}

/// Edit: merge the patch over the stored row and recompute `result`
///
/// # Arguments
/// * `pool` - Database pool
/// * `id` - Calculation to edit
/// * `owner` - If set, only a row owned by this user may be edited
/// * `patch` - Fields to replace; `None` keeps the stored value. A full
///   replace (PUT) is a patch with every field set.
///
/// # Returns
/// * The updated row, `result` recomputed from the merged kind and inputs
///
/// # Errors
/// * `AppError::NotFound` if the id does not exist or belongs to another owner
/// * `AppError::Calculation` if the merged inputs do not evaluate
/// * `AppError::Validation` if the patch moves the row to an unknown user
///
/// The ownership check, recomputation and write share one transaction, so a
/// concurrent reassignment cannot slip between check and write.
pub async fn update_calculation(
    pool: &SqlitePool,
    id: i64,
    owner: Option<i64>,
    patch: &CalculationPatch,
) -> Result<Calculation> {
    let mut tx = pool.begin().await?;

    let current: Calculation = sqlx::query_as::<_, CalculationRow>(
        r#"SELECT id, type, user_id, inputs, result, created_at, updated_at
           FROM calculations
           WHERE id = ? AND (? IS NULL OR user_id = ?)"#,
    )
    .bind(id)
    .bind(owner)
    .bind(owner)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(not_found)?
    .try_into()?;

    let kind = patch.kind.unwrap_or(current.kind);
    let inputs = patch.inputs.clone().unwrap_or(current.inputs);
    let user_id = patch.user_id.unwrap_or(current.user_id);

    let result = evaluate(kind, &inputs)?;

    if user_id != current.user_id && !user_exists(&mut *tx, user_id).await? {
        return Err(unknown_user(user_id));
    }

    let row = sqlx::query_as::<_, CalculationRow>(
        r#"UPDATE calculations
           SET type = ?, user_id = ?, inputs = ?, result = ?, updated_at = ?
           WHERE id = ?
           RETURNING id, type, user_id, inputs, result, created_at, updated_at"#,
    )
    .bind(kind.as_str())
    .bind(user_id)
    .bind(Json(&inputs))
    .bind(result)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| map_write_error(e, user_id))?;

    tx.commit().await?;

    row.try_into()
}

/// Delete (hard); with `owner` set, only that user's row
pub async fn delete_calculation(pool: &SqlitePool, id: i64, owner: Option<i64>) -> Result<()> {
    let deleted = sqlx::query(
        "DELETE FROM calculations WHERE id = ? AND (? IS NULL OR user_id = ?)",
    )
    .bind(id)
    .bind(owner)
    .bind(owner)
    .execute(pool)
    .await?;

    if deleted.rows_affected() == 0 {
        return Err(not_found());
    }

    Ok(())
}
