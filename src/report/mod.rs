mod repository;

pub use repository::*;

use serde::{Deserialize, Serialize};

/// Longest accepted `place_name`, in characters.
pub const MAX_PLACE_NAME_LENGTH: u64 = 100;

/// Report as saved on database.
///
/// `location` is stored as a PostGIS `GEOMETRY(POINT, 4326)`; rows are always
/// read back with derived `latitude`/`longitude` columns instead of the raw
/// geometry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Report {
    pub id: i64,
    pub place_name: String,
    /// 1 = Empty, 2 = Busy, 3 = Packed.
    pub crowd_status: i32,
    pub decibel_level: f64,
    pub vibe_tags: Vec<String>,
    pub user_id: i64,
    #[serde(rename = "timestamp")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub latitude: f64,
    pub longitude: f64,
}

/// A [`Report`] annotated with its geodesic distance from a query point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NearbyReport {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub report: Report,
    /// Kilometers from the query point, rounded to 2 decimal places.
    pub distance_km: f64,
}

/// Fields required to persist a new [`Report`].
#[derive(Clone, Debug, Default)]
pub struct NewReport {
    pub latitude: f64,
    pub longitude: f64,
    pub place_name: String,
    pub crowd_status: i32,
    pub decibel_level: f64,
    pub vibe_tags: Vec<String>,
}
