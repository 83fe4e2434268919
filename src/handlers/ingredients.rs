use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    Extension,
};
use model::entities::ingredient;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extract::{IdPath, ValidatedJson, ValidatedQuery};
use crate::schemas::{ApiResponse, AppState, AssignedOnlyQuery, ErrorResponse};
use crate::store::ingredients;

/// Request structure for creating a new ingredient
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateIngredientRequest {
    /// The name of the ingredient; surrounding whitespace is trimmed
    #[serde(default)]
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    #[schema(example = "Kale")]
    pub name: String,
}

/// Request structure for updating an existing ingredient
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateIngredientRequest {
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: Option<String>,
}

/// Response structure for ingredient operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IngredientResponse {
    pub id: i32,
    pub name: String,
}

impl From<ingredient::Model> for IngredientResponse {
    fn from(model: ingredient::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

/// List the caller's ingredients
#[utoipa::path(
    get,
    path = "/api/v1/ingredients",
    params(AssignedOnlyQuery),
    responses(
        (status = 200, description = "Ingredients ordered by name, descending", body = ApiResponse<Vec<IngredientResponse>>),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    security(("token_auth" = [])),
    tag = "ingredients"
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn get_ingredients(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedQuery(query): ValidatedQuery<AssignedOnlyQuery>,
) -> Result<Json<ApiResponse<Vec<IngredientResponse>>>, AppError> {
    debug!("Fetching ingredients (assigned_only: {})", query.is_set());

    let ingredient_responses: Vec<IngredientResponse> = ingredients::list_ingredients(&state.db, user.id, query.is_set())
        .await?
        .into_iter()
        .map(IngredientResponse::from)
        .collect();

    info!("Successfully fetched {} ingredients", ingredient_responses.len());
    Ok(Json(ApiResponse::new(
        ingredient_responses,
        "Ingredients retrieved successfully",
    )))
}

/// Create a new ingredient owned by the caller
#[utoipa::path(
    post,
    path = "/api/v1/ingredients",
    request_body = CreateIngredientRequest,
    responses(
        (status = 201, description = "Ingredient created successfully", body = ApiResponse<IngredientResponse>),
        (status = 400, description = "Invalid request data", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    security(("token_auth" = [])),
    tag = "ingredients"
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn create_ingredient(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateIngredientRequest>,
) -> Result<(StatusCode, Json<ApiResponse<IngredientResponse>>), AppError> {
    let ingredient_model = ingredients::create_ingredient(&state.db, user.id, &request.name).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            IngredientResponse::from(ingredient_model),
            "Ingredient created successfully",
        )),
    ))
}

/// Get a specific ingredient by ID
#[utoipa::path(
    get,
    path = "/api/v1/ingredients/{ingredient_id}",
    params(
        ("ingredient_id" = i32, Path, description = "Ingredient ID")
    ),
    responses(
        (status = 200, description = "Ingredient details", body = ApiResponse<IngredientResponse>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Ingredient not found", body = ErrorResponse)
    ),
    security(("token_auth" = [])),
    tag = "ingredients"
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn get_ingredient(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    IdPath(ingredient_id): IdPath,
) -> Result<Json<ApiResponse<IngredientResponse>>, AppError> {
    let ingredient_model = ingredients::get_ingredient(&state.db, user.id, ingredient_id).await?;

    Ok(Json(ApiResponse::new(
        IngredientResponse::from(ingredient_model),
        "Ingredient retrieved successfully",
    )))
}

/// Rename an ingredient
#[utoipa::path(
    patch,
    path = "/api/v1/ingredients/{ingredient_id}",
    params(
        ("ingredient_id" = i32, Path, description = "Ingredient ID")
    ),
    request_body = UpdateIngredientRequest,
    responses(
        (status = 200, description = "Ingredient updated successfully", body = ApiResponse<IngredientResponse>),
        (status = 400, description = "Invalid request data", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Ingredient not found", body = ErrorResponse)
    ),
    security(("token_auth" = [])),
    tag = "ingredients"
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn update_ingredient(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    IdPath(ingredient_id): IdPath,
    ValidatedJson(request): ValidatedJson<UpdateIngredientRequest>,
) -> Result<Json<ApiResponse<IngredientResponse>>, AppError> {
    let ingredient_model = ingredients::update_ingredient(&state.db, user.id, ingredient_id, request.name.as_deref()).await?;

    Ok(Json(ApiResponse::new(
        IngredientResponse::from(ingredient_model),
        "Ingredient updated successfully",
    )))
}

/// Delete an ingredient; recipes using it lose the link
#[utoipa::path(
    delete,
    path = "/api/v1/ingredients/{ingredient_id}",
    params(
        ("ingredient_id" = i32, Path, description = "Ingredient ID")
    ),
    responses(
        (status = 204, description = "Ingredient deleted successfully"),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Ingredient not found", body = ErrorResponse)
    ),
    security(("token_auth" = [])),
    tag = "ingredients"
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_ingredient(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    IdPath(ingredient_id): IdPath,
) -> Result<StatusCode, AppError> {
    ingredients::delete_ingredient(&state.db, user.id, ingredient_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
