//! Handle database requests.

use sqlx::{Pool, Postgres};

use crate::error::{Result, ServerError};
use crate::user::{NewUser, User};

const USER_COLUMNS: &str = "id, username, email, password_hash, name, avatar_url, bio, joined_at, is_active";

#[derive(Clone)]
pub struct UserRepository {
    pool: Pool<Postgres>,
}

impl UserRepository {
    /// Create a new [`UserRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a new user and return the stored row.
    ///
    /// Uniqueness violations on username/email surface as [`ServerError::Conflict`].
    pub async fn insert(&self, user: &NewUser) -> Result<User> {
        let query = format!(
            r#"INSERT INTO "user" (username, email, password_hash, name, avatar_url, bio)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {USER_COLUMNS}"#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.name)
            .bind(&user.avatar_url)
            .bind(&user.bio)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| match err.as_database_error() {
                Some(db) if db.is_unique_violation() => {
                    ServerError::Conflict("username or email")
                },
                _ => err.into(),
            })
    }

    /// Find a user using `id` field.
    pub async fn find_by_id(&self, user_id: i64) -> Result<Option<User>> {
        let query = get_by_field_query(Field::Id);

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Find a user using `username` field.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let query = get_by_field_query(Field::Username);

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// List users, optionally filtered on username/email substring.
    pub async fn list(
        &self,
        search: Option<&str>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<User>> {
        let query = format!(
            r#"SELECT {USER_COLUMNS} FROM "user"
                WHERE $1::TEXT IS NULL
                    OR username ILIKE '%' || $1 || '%'
                    OR email ILIKE '%' || $1 || '%'
                ORDER BY id
                OFFSET $2 LIMIT $3"#
        );

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(search)
            .bind(skip)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Update profile fields of an existing user.
    pub async fn update(&self, user: &User) -> Result<User> {
        let query = format!(
            r#"UPDATE "user"
                SET username = $1, email = $2, name = $3, avatar_url = $4, bio = $5
                WHERE id = $6
                RETURNING {USER_COLUMNS}"#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.avatar_url)
            .bind(&user.bio)
            .bind(user.id)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| match err.as_database_error() {
                Some(db) if db.is_unique_violation() => {
                    ServerError::Conflict("username or email")
                },
                _ => err.into(),
            })
    }

    /// Delete a user. Returns `false` when no row matched.
    pub async fn delete(&self, user_id: i64) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM "user" WHERE id = $1"#)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone)]
enum Field {
    Id,
    Username,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Field::Id => write!(f, "id"),
            Field::Username => write!(f, "username"),
        }
    }
}

fn get_by_field_query(field: Field) -> String {
    format!(r#"SELECT {USER_COLUMNS} FROM "user" WHERE {field} = $1"#)
}
