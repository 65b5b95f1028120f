use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    api::models::{
        MessageResponse,
        auth::{LoginRequest, LoginResponse, Role, SignupRequest},
    },
    auth::password::{self, Argon2Params},
    db::{
        handlers::{Repository, Users},
        models::users::UserCreateDBRequest,
    },
    errors::{Error, Result},
};

/// Register a new user account
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "User registered", body = MessageResponse),
        (status = 400, description = "Email already registered, invalid password or unknown role"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn signup(State(state): State<AppState>, Json(request): Json<SignupRequest>) -> Result<(StatusCode, Json<MessageResponse>)> {
    if !state.config.auth.allow_registration {
        return Err(Error::BadRequest {
            message: "User registration is disabled".to_string(),
        });
    }

    let password_config = &state.config.auth.password;
    password::validate_length(&request.password, password_config)?;

    let role = match request.role.as_deref() {
        None => Role::User,
        Some(raw) => raw.parse::<Role>().map_err(|e| Error::BadRequest {
            message: format!("Invalid role: {e}"),
        })?,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);
    if user_repo.get_user_by_email(&request.email).await?.is_some() {
        return Err(Error::BadRequest {
            message: "Email already registered".to_string(),
        });
    }

    // Hash the password on a blocking thread to avoid blocking async runtime
    let params = Argon2Params::from(password_config);
    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || password::hash_string_with_params(&password, Some(params)))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })??;

    // A concurrent signup with the same email still fails on users_email_unique
    let user = user_repo
        .create(&UserCreateDBRequest {
            email: request.email,
            full_name: request.full_name,
            password_hash,
            phone_number: request.phone_number,
            role,
        })
        .await?;
    tracing::info!(user_id = user.id, role = %user.role, "User signed up");

    Ok((StatusCode::CREATED, Json(MessageResponse::new("Signup successful"))))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Incorrect password"),
        (status = 404, description = "User not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<Json<LoginResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);

    let user = user_repo
        .get_user_by_email(&request.email)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "User".to_string(),
            id: request.email.clone(),
        })?;

    // Verify password on a blocking thread to avoid blocking async runtime
    let password = request.password;
    let hash = user.password_hash.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&password, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Err(Error::Unauthenticated {
            message: Some("Incorrect password".to_string()),
        });
    }

    user_repo.touch_last_login(user.id).await?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        user_id: user.id,
        name: user.full_name,
    }))
}
