use axum::{extract::State, http::StatusCode, response::Json, Extension};
use model::entities::user;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{forget_user, AuthenticatedUser};
use crate::error::AppError;
use crate::extract::ValidatedJson;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use crate::store::{
    tokens,
    users::{self, NewUser, UserChanges},
};

/// Request body for registering a new user
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateUserRequest {
    /// Email address, stored lowercase (must be unique)
    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    #[schema(example = "test@gmail.com")]
    pub email: String,
    /// Plaintext password, at least 5 characters
    #[serde(default)]
    #[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
    pub password: String,
    /// Display name
    #[serde(default)]
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: String,
}

/// Request body for updating the caller's profile
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: Option<String>,
    #[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
    pub password: Option<String>,
}

/// Credentials exchanged for a token
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct TokenRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    /// Send as `Authorization: Token <token>`
    pub token: String,
}

/// User response model. Never carries the password.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub name: String,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            name: model.name,
        }
    }
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request or email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(email = %request.email))]
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), AppError> {
    trace!("Entering create_user function");

    let user_model = users::create_user(
        &state.db,
        NewUser {
            email: request.email,
            password: request.password,
            name: request.name,
        },
    )
    .await?;

    info!("User created successfully with ID: {}", user_model.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            UserResponse::from(user_model),
            "User created successfully",
        )),
    ))
}

/// Exchange email and password for an API token
#[utoipa::path(
    post,
    path = "/api/v1/users/token",
    tag = "users",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token issued", body = ApiResponse<TokenResponse>),
        (status = 400, description = "Unable to authenticate with provided credentials", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn create_token(
    State(state): State<AppState>,
    request: Result<ValidatedJson<TokenRequest>, AppError>,
) -> Result<Json<ApiResponse<TokenResponse>>, AppError> {
    // Unreadable bodies get the same answer as wrong credentials
    let ValidatedJson(request) = request.map_err(|e| {
        debug!("Unreadable token request: {}", e);
        AppError::InvalidCredentials
    })?;

    let (token, user_model) =
        tokens::issue_token(&state.db, &request.email, &request.password).await?;

    debug!("Token issued for user {}", user_model.id);
    Ok(Json(ApiResponse::new(
        TokenResponse { token },
        "Token issued successfully",
    )))
}

/// Get the authenticated user's profile
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Profile of the caller", body = ApiResponse<UserResponse>),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn get_me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user_model = users::get_user(&state.db, user.id).await?;

    Ok(Json(ApiResponse::new(
        UserResponse::from(user_model),
        "User retrieved successfully",
    )))
}

/// Update the authenticated user's name and/or password
#[utoipa::path(
    patch,
    path = "/api/v1/users/me",
    tag = "users",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip(state, user, request), fields(user_id = user.id))]
pub async fn update_me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user_model = users::update_user(
        &state.db,
        user.id,
        UserChanges {
            name: request.name,
            password: request.password,
        },
    )
    .await?;

    // Cached identities carry the old name
    forget_user(&state, user.id);

    info!("User {} updated their profile", user_model.id);
    Ok(Json(ApiResponse::new(
        UserResponse::from(user_model),
        "User updated successfully",
    )))
}

/// Revoke the token used for this request (logout)
#[utoipa::path(
    delete,
    path = "/api/v1/users/me/token",
    tag = "users",
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn revoke_token(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<StatusCode, AppError> {
    tokens::revoke_token_hash(&state.db, &user.token_hash).await?;
    state.token_cache.invalidate(&user.token_hash).await;

    info!("User {} logged out", user.id);
    Ok(StatusCode::NO_CONTENT)
}
