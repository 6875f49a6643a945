//! User persistence: registration, credential lookup and the cash column.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::types::user::{User, UserCredential};

/// Row returned from DB (username is stored lowercase).
#[derive(FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub cash: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for UserCredential {
    fn from(row: UserRow) -> Self {
        UserCredential {
            user_id: row.id,
            username: row.username,
            password_hash: row.password_hash,
        }
    }
}

/// Get a user by username (lowercase).
pub async fn get_user_by_username<'e>(
    executor: impl PgExecutor<'e>,
    username_lowercase: &str,
) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        "SELECT id, username, password_hash, cash, created_at FROM users WHERE username = $1",
    )
    .bind(username_lowercase)
    .fetch_optional(executor)
    .await
}

/// Insert a user. Username must already be lowercase.
pub async fn insert_user<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    username: &str,
    password_hash: &str,
    cash: Decimal,
) -> LedgerResult<User> {
    let created_at = Utc::now();
    let inserted = sqlx::query(
        "INSERT INTO users (id, username, password_hash, cash, created_at) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(username)
    .bind(password_hash)
    .bind(cash)
    .bind(created_at)
    .execute(executor)
    .await;

    match inserted {
        Ok(_) => Ok(User {
            id,
            username: username.to_string(),
            cash,
            created_at,
        }),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(LedgerError::UsernameTaken(username.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Read the balance and take the row lock that serializes the user's trades.
pub async fn lock_user_cash<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
) -> Result<Option<Decimal>, sqlx::Error> {
    sqlx::query_scalar::<_, Decimal>("SELECT cash FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

pub async fn get_user_cash<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
) -> Result<Option<Decimal>, sqlx::Error> {
    sqlx::query_scalar::<_, Decimal>("SELECT cash FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

pub async fn update_user_cash<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    cash: Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET cash = $2 WHERE id = $1")
        .bind(user_id)
        .bind(cash)
        .execute(executor)
        .await?;
    Ok(())
}
