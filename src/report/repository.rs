//! Durable storage and geospatial retrieval of reports.

use sqlx::{Pool, Postgres};

use crate::error::{Result, ServerError};
use crate::report::{NearbyReport, NewReport, Report};

const REPORT_COLUMNS: &str = r#"id, place_name, crowd_status, decibel_level, vibe_tags, user_id, created_at,
       ST_Y(location::geometry) AS latitude,
       ST_X(location::geometry) AS longitude"#;

#[derive(Clone)]
pub struct ReportRepository {
    pool: Pool<Postgres>,
}

impl ReportRepository {
    /// Create a new [`ReportRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a report owned by `owner_id`.
    ///
    /// The point is stored as WGS84 (SRID 4326) and `created_at` is assigned
    /// by the database at insert time.
    pub async fn insert(&self, owner_id: i64, report: &NewReport) -> Result<Report> {
        let query = format!(
            r#"INSERT INTO report (place_name, crowd_status, decibel_level, vibe_tags, user_id, location)
                VALUES ($1, $2, $3, $4, $5, ST_SetSRID(ST_MakePoint($6, $7), 4326))
                RETURNING {REPORT_COLUMNS}"#
        );

        Ok(sqlx::query_as::<_, Report>(&query)
            .bind(&report.place_name)
            .bind(report.crowd_status)
            .bind(report.decibel_level)
            .bind(&report.vibe_tags)
            .bind(owner_id)
            .bind(report.longitude)
            .bind(report.latitude)
            .fetch_one(&self.pool)
            .await?)
    }

    /// Latest report per distinct `place_name` within `radius_meters`
    /// geodesic distance of the query point, nearest first.
    ///
    /// `ST_DWithin` on `geography` gives ellipsoidal distance semantics with
    /// an inclusive boundary; a report exactly at the radius is returned.
    pub async fn find_nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_meters: f64,
    ) -> Result<Vec<NearbyReport>> {
        let query = format!(
            r#"SELECT * FROM (
                SELECT DISTINCT ON (place_name)
                    {REPORT_COLUMNS},
                    ST_Distance(
                        location::geography,
                        ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography
                    ) / 1000.0 AS distance_km
                FROM report
                WHERE ST_DWithin(
                    location::geography,
                    ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography,
                    $3
                )
                ORDER BY place_name, created_at DESC
            ) AS latest
            ORDER BY distance_km"#
        );

        let mut reports = sqlx::query_as::<_, NearbyReport>(&query)
            .bind(longitude)
            .bind(latitude)
            .bind(radius_meters)
            .fetch_all(&self.pool)
            .await?;

        for report in &mut reports {
            report.distance_km = round_km(report.distance_km);
        }

        Ok(reports)
    }

    /// Delete a report on behalf of `requester_id`.
    ///
    /// Fails with `NotFound` when the report does not exist and `Forbidden`
    /// when the requester is not its owner.
    pub async fn delete(&self, report_id: i64, requester_id: i64) -> Result<()> {
        let owner: Option<(i64,)> =
            sqlx::query_as("SELECT user_id FROM report WHERE id = $1")
                .bind(report_id)
                .fetch_optional(&self.pool)
                .await?;

        let Some((owner_id,)) = owner else {
            return Err(ServerError::NotFound("report"));
        };

        if owner_id != requester_id {
            return Err(ServerError::Forbidden(
                "You can only delete your own reports.",
            ));
        }

        sqlx::query("DELETE FROM report WHERE id = $1")
            .bind(report_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Round a distance to 2 decimal places for the wire format.
fn round_km(distance: f64) -> f64 {
    (distance * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_km() {
        assert_eq!(round_km(0.134999), 0.13);
        assert_eq!(round_km(0.135001), 0.14);
        assert_eq!(round_km(12.0), 12.0);
    }
}
