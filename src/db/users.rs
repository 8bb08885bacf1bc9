use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::constants::ERR_USER_EXISTS;
use crate::error::{AppError, Result};
use crate::models::{NewUser, User};

/// Insert a new user
///
/// # Arguments
/// * `pool` - Database pool
/// * `new_user` - Normalized registration data with the password already hashed
///
/// # Returns
/// * The stored user, active and unverified
///
/// # Errors
/// * `AppError::Conflict` if the username or email is taken (unique index)
/// * `AppError::Database` for any other storage failure
pub async fn create_user(pool: &SqlitePool, new_user: &NewUser) -> Result<User> {
    let now = Utc::now();

    let inserted = sqlx::query_as::<_, User>(
        r#"INSERT INTO users
               (username, email, first_name, last_name, password_hash, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?)
           RETURNING id, username, email, first_name, last_name, password_hash,
                     is_active, is_verified, created_at, updated_at"#,
    )
    .bind(&new_user.username)
    .bind(&new_user.email)
    .bind(&new_user.first_name)
    .bind(&new_user.last_name)
    .bind(&new_user.password_hash)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await;

    match inserted {
        Ok(user) => Ok(user),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            tracing::info!("Registration rejected: username or email taken");
            Err(AppError::Conflict(ERR_USER_EXISTS.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn find_user_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"SELECT id, username, email, first_name, last_name, password_hash,
                  is_active, is_verified, created_at, updated_at
           FROM users WHERE username = ?"#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn find_user_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"SELECT id, username, email, first_name, last_name, password_hash,
                  is_active, is_verified, created_at, updated_at
           FROM users WHERE id = ?"#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Works on the pool or inside an open transaction
pub async fn user_exists<'e, E>(executor: E, id: i64) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
        .bind(id)
        .fetch_one(executor)
        .await?;

    Ok(count > 0)
}
