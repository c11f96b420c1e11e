mod repository;

pub use repository::*;

use serde::{Deserialize, Serialize};

/// Vibe as saved on database.
///
/// Unlike reports, vibes may exist without a location; the geometry column is
/// nullable and never read back directly.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vibe {
    pub id: i64,
    pub user_id: Option<i64>,
    pub place_name: String,
    pub crowd_status: i32,
    pub decibel_level: f64,
    pub vibe_tags: Option<Vec<String>>,
    #[serde(rename = "timestamp")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Fields required to persist a new [`Vibe`].
#[derive(Clone, Debug, Default)]
pub struct NewVibe {
    pub place_name: String,
    pub crowd_status: i32,
    pub decibel_level: f64,
    pub vibe_tags: Option<Vec<String>>,
}
