//! Crowd report routes: submit, query nearby, delete own.

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router, middleware};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;
use crate::report::{NearbyReport, NewReport, Report, ReportRepository};
use crate::router::Valid;
use crate::user::User;
use crate::AppState;

const DEFAULT_RADIUS_KM: f64 = 100.0;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    pub lat: f64,
    pub lon: f64,
    #[validate(length(
        min = 1,
        max = crate::report::MAX_PLACE_NAME_LENGTH,
        message = "Place name must be 1 to 100 characters long."
    ))]
    pub place_name: String,
    #[validate(range(min = 1, max = 3, message = "Crowd status must be 1, 2 or 3."))]
    pub crowd_status: i32,
    pub decibel_level: f64,
    pub vibe_tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lon: f64,
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
}

fn default_radius_km() -> f64 {
    DEFAULT_RADIUS_KM
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NearbyResponse {
    pub status: String,
    pub count: usize,
    pub radius_km: f64,
    pub data: Vec<NearbyReport>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub status: String,
    pub message: String,
}

/// Handler to submit a new report.
///
/// The owner always comes from the resolved identity, never from the body.
pub async fn submit(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Valid(body): Valid<Body>,
) -> Result<Json<Report>> {
    let report = ReportRepository::new(state.db.postgres.clone())
        .insert(
            user.id,
            &NewReport {
                latitude: body.lat,
                longitude: body.lon,
                place_name: body.place_name,
                crowd_status: body.crowd_status,
                decibel_level: body.decibel_level,
                vibe_tags: body.vibe_tags,
            },
        )
        .await?;

    Ok(Json(report))
}

/// Handler returning the latest report per place around a point.
///
/// Public route, no authentication required.
pub async fn nearby(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<NearbyResponse>> {
    let data = ReportRepository::new(state.db.postgres.clone())
        .find_nearby(query.lat, query.lon, query.radius_km * 1000.0)
        .await?;

    Ok(Json(NearbyResponse {
        status: "success".to_owned(),
        count: data.len(),
        radius_km: query.radius_km,
        data,
    }))
}

/// Handler to delete one of the authenticated user's reports.
pub async fn delete_own(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(report_id): Path<i64>,
) -> Result<Json<DeleteResponse>> {
    ReportRepository::new(state.db.postgres.clone())
        .delete(report_id, user.id)
        .await?;

    Ok(Json(DeleteResponse {
        status: "success".to_owned(),
        message: format!("Report {report_id} deleted successfully"),
    }))
}

pub fn router(state: AppState) -> Router<AppState> {
    let authenticated = Router::new()
        // `POST /` goes to `submit`. Authorization required.
        .route("/", post(submit))
        // `DELETE /:ID` goes to `delete_own`. Authorization required.
        .route("/{report_id}", delete(delete_own))
        .route_layer(middleware::from_fn_with_state(state, crate::router::auth));

    Router::new()
        // `GET /nearby` goes to `nearby`.
        .route("/nearby", get(nearby))
        .merge(authenticated)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};

    use super::*;
    use crate::*;

    fn body(crowd_status: i32, place_name: &str) -> Body {
        Body {
            lat: 40.0,
            lon: -73.0,
            place_name: place_name.into(),
            crowd_status,
            decibel_level: 55.5,
            vibe_tags: vec!["quiet".into(), "wifi".into()],
        }
    }

    #[test]
    fn test_crowd_status_range() {
        for valid in 1..=3 {
            assert!(body(valid, "Cafe X").validate().is_ok());
        }
        for invalid in [0, 4, -1, 100] {
            assert!(body(invalid, "Cafe X").validate().is_err());
        }
    }

    #[test]
    fn test_place_name_length() {
        assert!(body(2, &"x".repeat(100)).validate().is_ok());
        assert!(body(2, &"x".repeat(101)).validate().is_err());
        assert!(body(2, "").validate().is_err());
    }

    #[tokio::test]
    async fn test_submit_requires_token() {
        let state = router::state();
        let app = app(state);

        let response = make_request(
            app,
            Method::POST,
            "/api/reports/",
            None,
            "application/json",
            serde_json::json!(body(2, "Cafe X")).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_nearby_requires_coordinates() {
        let state = router::state();
        let app = app(state);

        let response = make_request(
            app,
            Method::GET,
            "/api/reports/nearby?lat=40.0",
            None,
            "application/json",
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
