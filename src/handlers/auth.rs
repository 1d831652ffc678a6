// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{CreateUserRequest, LoginRequest, NewUser, ROLE_USER, UserResponse},
    storage::DynStorage,
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created with a token so the client is signed in immediately.
pub async fn register(
    State(storage): State<DynStorage>,
    State(config): State<Config>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;

    let user = storage
        .create_user(NewUser {
            username: payload.username,
            password: hashed_password,
            email: payload.email,
            display_name: payload.display_name,
            role: ROLE_USER.to_string(),
        })
        .await?;

    tracing::info!(user_id = user.id, "User registered");

    let token = sign_jwt(&user, &config.jwt_secret, config.jwt_expiration)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "token": token,
            "type": "Bearer",
            "user": UserResponse::from(&user),
        })),
    ))
}

/// Authenticates a user and returns a JWT token.
///
/// Unknown usernames and wrong passwords get the same answer.
pub async fn login(
    State(storage): State<DynStorage>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|_| AppError::BadRequest("Username and password are required".to_string()))?;

    let user = storage
        .find_user_by_username(&payload.username)
        .await?
        .ok_or(AppError::AuthError("Invalid credentials".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    let token = sign_jwt(&user, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "type": "Bearer",
        "user": UserResponse::from(&user),
    })))
}

/// Returns the current user.
pub async fn me(
    State(storage): State<DynStorage>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = storage
        .get_user(claims.user_id()?)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(&user)))
}
