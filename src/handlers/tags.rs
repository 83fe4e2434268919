use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    Extension,
};
use model::entities::tag;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extract::{IdPath, ValidatedJson, ValidatedQuery};
use crate::schemas::{ApiResponse, AppState, AssignedOnlyQuery, ErrorResponse};
use crate::store::tags;

/// Request structure for creating a new tag
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateTagRequest {
    /// The name of the tag; surrounding whitespace is trimmed
    #[serde(default)]
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    #[schema(example = "Vegan")]
    pub name: String,
}

/// Request structure for updating an existing tag
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateTagRequest {
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: Option<String>,
}

/// Response structure for tag operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TagResponse {
    pub id: i32,
    pub name: String,
}

impl From<tag::Model> for TagResponse {
    fn from(model: tag::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

/// List the caller's tags
#[utoipa::path(
    get,
    path = "/api/v1/tags",
    params(AssignedOnlyQuery),
    responses(
        (status = 200, description = "Tags ordered by name, descending", body = ApiResponse<Vec<TagResponse>>),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    security(("token_auth" = [])),
    tag = "tags"
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn get_tags(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedQuery(query): ValidatedQuery<AssignedOnlyQuery>,
) -> Result<Json<ApiResponse<Vec<TagResponse>>>, AppError> {
    debug!("Fetching tags (assigned_only: {})", query.is_set());

    let tag_responses: Vec<TagResponse> = tags::list_tags(&state.db, user.id, query.is_set())
        .await?
        .into_iter()
        .map(TagResponse::from)
        .collect();

    info!("Successfully fetched {} tags", tag_responses.len());
    Ok(Json(ApiResponse::new(
        tag_responses,
        "Tags retrieved successfully",
    )))
}

/// Create a new tag owned by the caller
#[utoipa::path(
    post,
    path = "/api/v1/tags",
    request_body = CreateTagRequest,
    responses(
        (status = 201, description = "Tag created successfully", body = ApiResponse<TagResponse>),
        (status = 400, description = "Invalid request data", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    security(("token_auth" = [])),
    tag = "tags"
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn create_tag(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateTagRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TagResponse>>), AppError> {
    let tag_model = tags::create_tag(&state.db, user.id, &request.name).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            TagResponse::from(tag_model),
            "Tag created successfully",
        )),
    ))
}

/// Get a specific tag by ID
#[utoipa::path(
    get,
    path = "/api/v1/tags/{tag_id}",
    params(
        ("tag_id" = i32, Path, description = "Tag ID")
    ),
    responses(
        (status = 200, description = "Tag details", body = ApiResponse<TagResponse>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Tag not found", body = ErrorResponse)
    ),
    security(("token_auth" = [])),
    tag = "tags"
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn get_tag(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    IdPath(tag_id): IdPath,
) -> Result<Json<ApiResponse<TagResponse>>, AppError> {
    let tag_model = tags::get_tag(&state.db, user.id, tag_id).await?;

    Ok(Json(ApiResponse::new(
        TagResponse::from(tag_model),
        "Tag retrieved successfully",
    )))
}

/// Rename a tag
#[utoipa::path(
    patch,
    path = "/api/v1/tags/{tag_id}",
    params(
        ("tag_id" = i32, Path, description = "Tag ID")
    ),
    request_body = UpdateTagRequest,
    responses(
        (status = 200, description = "Tag updated successfully", body = ApiResponse<TagResponse>),
        (status = 400, description = "Invalid request data", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Tag not found", body = ErrorResponse)
    ),
    security(("token_auth" = [])),
    tag = "tags"
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn update_tag(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    IdPath(tag_id): IdPath,
    ValidatedJson(request): ValidatedJson<UpdateTagRequest>,
) -> Result<Json<ApiResponse<TagResponse>>, AppError> {
    let tag_model = tags::update_tag(&state.db, user.id, tag_id, request.name.as_deref()).await?;

    Ok(Json(ApiResponse::new(
        TagResponse::from(tag_model),
        "Tag updated successfully",
    )))
}

/// Delete a tag; recipes using it lose the link
#[utoipa::path(
    delete,
    path = "/api/v1/tags/{tag_id}",
    params(
        ("tag_id" = i32, Path, description = "Tag ID")
    ),
    responses(
        (status = 204, description = "Tag deleted successfully"),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Tag not found", body = ErrorResponse)
    ),
    security(("token_auth" = [])),
    tag = "tags"
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_tag(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    IdPath(tag_id): IdPath,
) -> Result<StatusCode, AppError> {
    tags::delete_tag(&state.db, user.id, tag_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
