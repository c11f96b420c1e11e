//! Vibes-related HTTP API.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Extension, Json, Router, middleware};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;
use crate::router::Valid;
use crate::user::User;
use crate::vibe::{NewVibe, Vibe, VibeRepository};
use crate::{AppState, ServerError};

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

/// Canned vibes for the demo endpoint.
const MOCK_VIBES: &[MockVibe] = &[
    MockVibe {
        mood: "Calm & Cozy",
        emoji: "🧘",
        description: "Peaceful energy around you.",
    },
    MockVibe {
        mood: "Busy & Buzzing",
        emoji: "🚀",
        description: "The area is full of energy and activity — stay alert!",
    },
    MockVibe {
        mood: "Lively & Fun",
        emoji: "🎉",
        description: "People are having a good time nearby.",
    },
    MockVibe {
        mood: "Focused & Chill",
        emoji: "🎧",
        description: "A quiet, productive vibe — great for work or study.",
    },
    MockVibe {
        mood: "Romantic & Warm",
        emoji: "💞",
        description: "Love is in the air!",
    },
];

#[derive(Debug, Clone, Serialize)]
pub struct MockVibe {
    pub mood: &'static str,
    pub emoji: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RandomResponse {
    pub status: String,
    pub vibe: MockVibe,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(length(
        min = 1,
        max = 150,
        message = "Place name must be 1 to 150 characters long."
    ))]
    pub place_name: String,
    #[validate(range(min = 1, max = 3, message = "Crowd status must be 1, 2 or 3."))]
    pub crowd_status: i32,
    pub decibel_level: f64,
    pub vibe_tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub user_id: Option<i64>,
    /// Substring match on place name.
    pub place: Option<String>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub status: String,
    pub message: String,
}

/// Handler returning a random demo vibe.
pub async fn random() -> Json<RandomResponse> {
    let vibe = MOCK_VIBES
        .choose(&mut rand::thread_rng())
        .cloned()
        .unwrap_or(MOCK_VIBES[0].clone());

    Json(RandomResponse {
        status: "success".to_owned(),
        vibe,
    })
}

/// Handler to create a vibe owned by the authenticated user.
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Valid(body): Valid<Body>,
) -> Result<Json<Vibe>> {
    let vibe = VibeRepository::new(state.db.postgres.clone())
        .insert(
            user.id,
            &NewVibe {
                place_name: body.place_name,
                crowd_status: body.crowd_status,
                decibel_level: body.decibel_level,
                vibe_tags: body.vibe_tags,
            },
        )
        .await?;

    Ok(Json(vibe))
}

/// Handler to list vibes with filters and pagination.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Vibe>>> {
    let skip = query.skip.max(0);
    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);

    let vibes = VibeRepository::new(state.db.postgres.clone())
        .list(query.user_id, query.place.as_deref(), skip, limit)
        .await?;

    Ok(Json(vibes))
}

/// Fetch a vibe and check the requester owns it.
async fn owned_vibe(
    repo: &VibeRepository,
    vibe_id: i64,
    requester: &User,
    denied: &'static str,
) -> Result<Vibe> {
    let vibe = repo
        .find_by_id(vibe_id)
        .await?
        .ok_or(ServerError::NotFound("vibe"))?;

    if vibe.user_id != Some(requester.id) {
        return Err(ServerError::Forbidden(denied));
    }

    Ok(vibe)
}

/// Handler to overwrite one of the authenticated user's vibes.
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(vibe_id): Path<i64>,
    Valid(body): Valid<Body>,
) -> Result<Json<Vibe>> {
    let repo = VibeRepository::new(state.db.postgres.clone());
    let vibe =
        owned_vibe(&repo, vibe_id, &user, "You can only edit your own vibes.")
            .await?;

    let vibe = repo
        .update(
            vibe.id,
            &NewVibe {
                place_name: body.place_name,
                crowd_status: body.crowd_status,
                decibel_level: body.decibel_level,
                vibe_tags: body.vibe_tags,
            },
        )
        .await?;

    Ok(Json(vibe))
}

/// Handler to delete one of the authenticated user's vibes.
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(vibe_id): Path<i64>,
) -> Result<Json<DeleteResponse>> {
    let repo = VibeRepository::new(state.db.postgres.clone());
    let vibe =
        owned_vibe(&repo, vibe_id, &user, "You can only delete your own vibes.")
            .await?;

    repo.delete(vibe.id).await?;

    Ok(Json(DeleteResponse {
        status: "success".to_owned(),
        message: format!("Vibe {vibe_id} deleted successfully"),
    }))
}

pub fn router(state: AppState) -> Router<AppState> {
    let authenticated = Router::new()
        // `POST /` goes to `create`. Authorization required.
        .route("/", axum::routing::post(create))
        // `PUT|DELETE /:ID` go to `update`/`delete`. Authorization required.
        .route("/{vibe_id}", axum::routing::put(update).delete(delete))
        .route_layer(middleware::from_fn_with_state(state, crate::router::auth));

    Router::new()
        // `GET /random` goes to `random`.
        .route("/random", get(random))
        // `GET /` goes to `list`.
        .route("/", get(list))
        .merge(authenticated)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;

    use super::*;
    use crate::*;

    #[tokio::test]
    async fn test_random_vibe() {
        let state = router::state();
        let app = app(state);

        let response = make_request(
            app,
            Method::GET,
            "/api/vibes/random",
            None,
            "application/json",
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["status"], "success");
        assert!(MOCK_VIBES
            .iter()
            .any(|vibe| vibe.mood == body["vibe"]["mood"].as_str().unwrap()));
    }

    #[tokio::test]
    async fn test_create_requires_token() {
        let state = router::state();
        let app = app(state);

        let response = make_request(
            app,
            Method::POST,
            "/api/vibes/",
            None,
            "application/json",
            serde_json::json!({
                "place_name": "Cafe X",
                "crowd_status": 2,
                "decibel_level": 55.5,
            })
            .to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
