//! Handle database requests.

use sqlx::{Pool, Postgres};

use crate::error::Result;
use crate::vibe::{NewVibe, Vibe};

const VIBE_COLUMNS: &str =
    "id, user_id, place_name, crowd_status, decibel_level, vibe_tags, created_at";

#[derive(Clone)]
pub struct VibeRepository {
    pool: Pool<Postgres>,
}

impl VibeRepository {
    /// Create a new [`VibeRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a vibe owned by `owner_id`.
    pub async fn insert(&self, owner_id: i64, vibe: &NewVibe) -> Result<Vibe> {
        let query = format!(
            r#"INSERT INTO vibe (user_id, place_name, crowd_status, decibel_level, vibe_tags)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {VIBE_COLUMNS}"#
        );

        Ok(sqlx::query_as::<_, Vibe>(&query)
            .bind(owner_id)
            .bind(&vibe.place_name)
            .bind(vibe.crowd_status)
            .bind(vibe.decibel_level)
            .bind(&vibe.vibe_tags)
            .fetch_one(&self.pool)
            .await?)
    }

    /// Find a vibe using `id` field.
    pub async fn find_by_id(&self, vibe_id: i64) -> Result<Option<Vibe>> {
        let query = format!("SELECT {VIBE_COLUMNS} FROM vibe WHERE id = $1");

        Ok(sqlx::query_as::<_, Vibe>(&query)
            .bind(vibe_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// List vibes, optionally filtered by owner and place substring.
    pub async fn list(
        &self,
        user_id: Option<i64>,
        place: Option<&str>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Vibe>> {
        let query = format!(
            r#"SELECT {VIBE_COLUMNS} FROM vibe
                WHERE ($1::BIGINT IS NULL OR user_id = $1)
                    AND ($2::TEXT IS NULL OR place_name ILIKE '%' || $2 || '%')
                ORDER BY id
                OFFSET $3 LIMIT $4"#
        );

        Ok(sqlx::query_as::<_, Vibe>(&query)
            .bind(user_id)
            .bind(place)
            .bind(skip)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Overwrite the mutable fields of an existing vibe.
    pub async fn update(&self, vibe_id: i64, vibe: &NewVibe) -> Result<Vibe> {
        let query = format!(
            r#"UPDATE vibe
                SET place_name = $1, crowd_status = $2, decibel_level = $3, vibe_tags = $4
                WHERE id = $5
                RETURNING {VIBE_COLUMNS}"#
        );

        Ok(sqlx::query_as::<_, Vibe>(&query)
            .bind(&vibe.place_name)
            .bind(vibe.crowd_status)
            .bind(vibe.decibel_level)
            .bind(&vibe.vibe_tags)
            .bind(vibe_id)
            .fetch_one(&self.pool)
            .await?)
    }

    /// Delete a vibe. Returns `false` when no row matched.
    pub async fn delete(&self, vibe_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM vibe WHERE id = $1")
            .bind(vibe_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
