//! Registration, login and current-user profile routes.

use std::path::Path;

use axum::extract::{Multipart, State};
use axum::routing::{get, post};
use axum::{Extension, Form, Json, Router, middleware};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::Result;
use crate::router::Valid;
use crate::user::{NewUser, User, UserRepository};
use crate::{AppState, ServerError};

pub const TOKEN_TYPE: &str = "bearer";

const UPLOAD_DIR: &str = "uploads";
const AVATAR_NAME_BYTES: usize = 12;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterBody {
    #[validate(
        length(min = 2, max = 50),
        custom(
            function = crate::router::validate_username,
            message = "Username must be alphanumeric."
        )
    )]
    pub username: String,
    #[validate(length(
        min = 6,
        max = 255,
        message = "Password must contain at least 6 characters."
    ))]
    pub password: String,
    #[validate(email(message = "Email must be formatted."))]
    pub email: Option<String>,
    #[validate(length(max = 100))]
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    #[validate(length(max = 255))]
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub username: String,
    pub password: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Handler to register a new user.
pub async fn register(
    State(state): State<AppState>,
    Valid(body): Valid<RegisterBody>,
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

    let user = repo
        .insert(&NewUser {
            username: body.username,
            email: body.email,
            password_hash,
            name: body.name,
            avatar_url: body.avatar_url,
            bio: body.bio,
        })
        .await?;

    Ok(Json(user))
}

/// Handler to exchange credentials for a bearer token.
pub async fn login(
    State(state): State<AppState>,
    Form(body): Form<LoginBody>,
) -> Result<Json<TokenResponse>> {
    let user = UserRepository::new(state.db.postgres.clone())
        .find_by_username(&body.username)
        .await?;

    // Hash comparison runs even without a row so both failures behave alike.
    let verified = match &user {
        Some(user) => state
            .crypto
            .pwd
            .verify_password(&body.password, &user.password_hash),
        None => state.crypto.pwd.verify_password(&body.password, ""),
    };

    let user = user.filter(|_| verified).ok_or(ServerError::InvalidCredentials)?;
    let access_token = state.token.create(&user.username)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: TOKEN_TYPE.to_owned(),
    }))
}

/// Handler returning the authenticated user.
pub async fn me(Extension(user): Extension<User>) -> Json<User> {
    Json(user)
}

pub(crate) fn no_fields_provided() -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(
        "body",
        ValidationError::new("empty_update")
            .with_message("No fields provided.".into()),
    );
    errors
}

/// Handler to update the authenticated user's profile.
///
/// Accepts multipart form data: `name`, `bio` text fields and an optional
/// avatar file under `avatar` or `avatar_url`.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(mut user): Extension<User>,
    mut multipart: Multipart,
) -> Result<Json<User>> {
    let mut updated = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ServerError::ParsingForm(Box::new(err)))?
    {
        match field.name() {
            Some("name") => {
                user.name = Some(
                    field
                        .text()
                        .await
                        .map_err(|err| ServerError::ParsingForm(Box::new(err)))?,
                );
                updated = true;
            },
            Some("bio") => {
                user.bio = Some(
                    field
                        .text()
                        .await
                        .map_err(|err| ServerError::ParsingForm(Box::new(err)))?,
                );
                updated = true;
            },
            Some("avatar") | Some("avatar_url") => {
                let extension = field
                    .file_name()
                    .and_then(|name| {
                        Path::new(name)
                            .extension()
                            .and_then(|ext| ext.to_str())
                            .map(|ext| format!(".{ext}"))
                    })
                    .unwrap_or_default();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| ServerError::ParsingForm(Box::new(err)))?;

                user.avatar_url =
                    Some(save_avatar(&state, &extension, &bytes).await?);
                updated = true;
            },
            _ => {},
        }
    }

    if !updated {
        return Err(no_fields_provided().into());
    }

    let user = UserRepository::new(state.db.postgres.clone())
        .update(&user)
        .await?;

    Ok(Json(user))
}

/// Write avatar bytes under the static uploads directory with a random name.
async fn save_avatar(
    state: &AppState,
    extension: &str,
    bytes: &[u8],
) -> Result<String> {
    let mut name = [0u8; AVATAR_NAME_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut name);
    let file_name = format!("{}{extension}", hex::encode(name));

    let static_dir = state
        .config
        .static_dir
        .clone()
        .unwrap_or_else(|| "static".into());
    let upload_dir = static_dir.join(UPLOAD_DIR);

    let write = async {
        tokio::fs::create_dir_all(&upload_dir).await?;
        tokio::fs::write(upload_dir.join(&file_name), bytes).await
    };

    write.await.map_err(|err| ServerError::Internal {
        details: "failed to save uploaded file".into(),
        source: Some(Box::new(err)),
    })?;

    Ok(format!("/static/{UPLOAD_DIR}/{file_name}"))
}

pub fn router(state: AppState) -> Router<AppState> {
    let me_router = Router::new()
        .route("/me", get(me).put(update_me))
        .route_layer(middleware::from_fn_with_state(state, crate::router::auth));

    Router::new()
        // `POST /register` goes to `register`.
        .route("/register", post(register))
        // `POST /login` goes to `login`.
        .route("/login", post(login))
        // `GET|PUT /me` go to `me`/`update_me`. Authorization required.
        .merge(me_router)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};

    use super::*;
    use crate::*;

    #[test]
    fn test_register_body_validation() {
        let valid = RegisterBody {
            username: "alice".into(),
            password: "secret1".into(),
            email: Some("alice@example.org".into()),
            name: None,
            avatar_url: None,
            bio: None,
        };
        assert!(valid.validate().is_ok());

        let short_password = RegisterBody {
            password: "12345".into(),
            ..valid_body()
        };
        assert!(short_password.validate().is_err());

        let bad_email = RegisterBody {
            email: Some("not-an-email".into()),
            ..valid_body()
        };
        assert!(bad_email.validate().is_err());

        let bad_username = RegisterBody {
            username: "white space".into(),
            ..valid_body()
        };
        assert!(bad_username.validate().is_err());
    }

    fn valid_body() -> RegisterBody {
        RegisterBody {
            username: "alice".into(),
            password: "secret1".into(),
            email: None,
            name: None,
            avatar_url: None,
            bio: None,
        }
    }

    #[tokio::test]
    async fn test_me_requires_token() {
        let state = router::state();
        let app = app(state);

        let response = make_request(
            app.clone(),
            Method::GET,
            "/api/auth/me",
            None,
            "application/json",
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // A malformed token is rejected before any user lookup.
        let response = make_request(
            app,
            Method::GET,
            "/api/auth/me",
            Some("garbage"),
            "application/json",
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_register_rejects_weak_password() {
        let state = router::state();
        let app = app(state);

        let response = make_request(
            app,
            Method::POST,
            "/api/auth/register",
            None,
            "application/json",
            serde_json::json!({"username": "alice", "password": "12345"})
                .to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
