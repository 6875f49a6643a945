use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub cash: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Login material. Username is stored lowercase.
#[derive(Clone)]
pub struct UserCredential {
    pub user_id: Uuid,
    pub username: String,
    pub password_hash: String,
}

pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub starting_cash: Decimal,
}
