mod repository;

pub use repository::*;

use serde::{Deserialize, Serialize};

/// User as saved on database.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip)]
    pub password_hash: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub joined_at: chrono::DateTime<chrono::Utc>,
    pub is_active: bool,
}

/// Fields required to register a [`User`].
///
/// `password_hash` is always a PHC string; plaintext never reaches the
/// repository.
#[derive(Clone, Debug, Default)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}
