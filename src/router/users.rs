//! Users-related HTTP API.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::Configuration;
use crate::error::Result;
use crate::router::Valid;
use crate::user::{NewUser, User, UserRepository};
use crate::{AppState, ServerError};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Substring match on username or email.
    pub search: Option<String>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateBody {
    #[validate(
        length(min = 2, max = 50),
        custom(
            function = crate::router::validate_username,
            message = "Username must be alphanumeric."
        )
    )]
    pub username: Option<String>,
    #[validate(email(message = "Email must be formatted."))]
    pub email: Option<String>,
    #[validate(length(max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 255))]
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

impl UpdateBody {
    fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.name.is_none()
            && self.bio.is_none()
            && self.avatar_url.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub status: String,
    pub message: String,
}

/// Rewrite a stored relative avatar path to an absolute URL.
fn absolutize_avatar(config: &Configuration, user: &mut User) {
    if let Some(avatar) = &user.avatar_url {
        if !avatar.starts_with("http") {
            let base = config.url.trim_end_matches('/');
            let file = avatar.rsplit('/').next().unwrap_or(avatar);
            user.avatar_url = Some(format!("{base}/static/uploads/{file}"));
        }
    }
}

/// Handler to create a user.
///
/// Same persistence path as registration: the password is hashed before it
/// reaches the repository.
pub async fn create(
    State(state): State<AppState>,
    Valid(body): Valid<crate::router::auth::RegisterBody>,
) -> Result<Json<User>> {
    let repo = UserRepository::new(state.db.postgres.clone());

    if repo.find_by_username(&body.username).await?.is_some() {
        return Err(ServerError::Conflict("username"));
    }

    let password_hash = state
        .crypto
        .pwd
        .hash_password(&body.password)
        .map_err(|err| ServerError::Internal {
            details: "password hashing failed".into(),
            source: Some(Box::new(err)),
        })?;

    let mut user = repo
        .insert(&NewUser {
            username: body.username,
            email: body.email,
            password_hash,
            name: body.name,
            avatar_url: body.avatar_url,
            bio: body.bio,
        })
        .await?;

    absolutize_avatar(&state.config, &mut user);
    Ok(Json(user))
}

/// Handler to list users with search and pagination.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<User>>> {
    let skip = query.skip.max(0);
    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);

    let mut users = UserRepository::new(state.db.postgres.clone())
        .list(query.search.as_deref(), skip, limit)
        .await?;

    for user in &mut users {
        absolutize_avatar(&state.config, user);
    }

    Ok(Json(users))
}

/// Handler to fetch a single user.
pub async fn get_one(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<User>> {
    let mut user = UserRepository::new(state.db.postgres.clone())
        .find_by_id(user_id)
        .await?
        .ok_or(ServerError::NotFound("user"))?;

    absolutize_avatar(&state.config, &mut user);
    Ok(Json(user))
}

/// Handler for partial profile updates.
pub async fn update(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Valid(body): Valid<UpdateBody>,
) -> Result<Json<User>> {
    if body.is_empty() {
        return Err(ServerError::Validation(super::auth::no_fields_provided()));
    }

    let repo = UserRepository::new(state.db.postgres.clone());
    let mut user = repo
        .find_by_id(user_id)
        .await?
        .ok_or(ServerError::NotFound("user"))?;

    if let Some(username) = body.username {
        user.username = username;
    }
    if let Some(email) = body.email {
        user.email = Some(email);
    }
    if let Some(name) = body.name {
        user.name = Some(name);
    }
    if let Some(bio) = body.bio {
        user.bio = Some(bio);
    }
    if let Some(avatar_url) = body.avatar_url {
        user.avatar_url = Some(avatar_url);
    }

    let mut user = repo.update(&user).await?;
    absolutize_avatar(&state.config, &mut user);
    Ok(Json(user))
}

/// Handler to delete a user.
pub async fn delete(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<DeleteResponse>> {
    let repo = UserRepository::new(state.db.postgres.clone());
    let user = repo
        .find_by_id(user_id)
        .await?
        .ok_or(ServerError::NotFound("user"))?;

    repo.delete(user.id).await?;

    Ok(Json(DeleteResponse {
        status: "success".to_owned(),
        message: format!("User {} deleted successfully", user.username),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        // `POST /` goes to `create`, `GET /` goes to `list`.
        .route("/", get(list).post(create))
        // `GET|PUT|DELETE /:ID` go to the single-user handlers.
        .route("/{user_id}", get(get_one).put(update).delete(delete))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_avatar(avatar_url: Option<&str>) -> User {
        User {
            avatar_url: avatar_url.map(Into::into),
            ..Default::default()
        }
    }

    fn config() -> Configuration {
        Configuration {
            url: "https://vibecheck.example.org/".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_absolutize_avatar() {
        let config = config();

        let mut user = user_with_avatar(Some("/static/uploads/abc123.png"));
        absolutize_avatar(&config, &mut user);
        assert_eq!(
            user.avatar_url.as_deref(),
            Some("https://vibecheck.example.org/static/uploads/abc123.png")
        );

        // Already-absolute URLs pass through unchanged.
        let mut user = user_with_avatar(Some("https://cdn.example.org/a.png"));
        absolutize_avatar(&config, &mut user);
        assert_eq!(
            user.avatar_url.as_deref(),
            Some("https://cdn.example.org/a.png")
        );

        let mut user = user_with_avatar(None);
        absolutize_avatar(&config, &mut user);
        assert_eq!(user.avatar_url, None);
    }

    #[test]
    fn test_empty_update_detection() {
        let empty = UpdateBody {
            username: None,
            email: None,
            name: None,
            bio: None,
            avatar_url: None,
        };
        assert!(empty.is_empty());

        let partial = UpdateBody {
            bio: Some("night owl".into()),
            ..empty
        };
        assert!(!partial.is_empty());
    }
}
