use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    Extension,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{ingredients::IngredientResponse, tags::TagResponse};
use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::extract::{IdPath, ValidatedJson, ValidatedQuery};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use crate::store::recipes::{self, NewRecipe, RecipeChanges, RecipeDetail, RecipeFilter, RecipeWithLinks};

/// Query parameters for listing recipes
#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecipeQuery {
    /// Comma-separated tag IDs; recipes linked to any of them are returned
    #[validate(length(max = 1024))]
    pub tags: Option<String>,
    /// Comma-separated ingredient IDs; recipes linked to any of them are returned
    #[validate(length(max = 1024))]
    pub ingredients: Option<String>,
}

/// Parse a `1,2,3` query value into ids.
fn parse_ids(field: &str, raw: Option<&str>) -> AppResult<Vec<i32>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i32>()
                .map_err(|_| AppError::field(field, format!("\"{}\" is not a valid id.", part)))
        })
        .collect()
}

impl RecipeQuery {
    fn to_filter(&self) -> AppResult<RecipeFilter> {
        Ok(RecipeFilter {
            tags: parse_ids("tags", self.tags.as_deref())?,
            ingredients: parse_ids("ingredients", self.ingredients.as_deref())?,
        })
    }
}

/// Request body for creating a recipe
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateRecipeRequest {
    #[serde(default)]
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    #[schema(example = "Tamales")]
    pub title: String,
    /// Preparation time in minutes
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    #[schema(example = 120)]
    pub time_minutes: i32,
    /// Up to 999.99 with at most two decimal places; number or string
    #[schema(value_type = String, example = "100.00")]
    pub price: Decimal,
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub link: Option<String>,
    /// IDs of the caller's tags
    #[serde(default)]
    pub tags: Vec<i32>,
    /// IDs of the caller's ingredients
    #[serde(default)]
    pub ingredients: Vec<i32>,
}

/// Request body for a partial recipe update
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateRecipeRequest {
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub title: Option<String>,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub time_minutes: Option<i32>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    /// An empty string clears the link
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub link: Option<String>,
    /// Replaces the linked tags when present
    pub tags: Option<Vec<i32>>,
    /// Replaces the linked ingredients when present
    pub ingredients: Option<Vec<i32>>,
}

/// Recipe as shown in listings: links as IDs
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecipeResponse {
    pub id: i32,
    pub title: String,
    pub time_minutes: i32,
    #[schema(value_type = String, example = "5.00")]
    pub price: Decimal,
    pub link: Option<String>,
    pub tags: Vec<i32>,
    pub ingredients: Vec<i32>,
}

/// Recipe detail: links expanded
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecipeDetailResponse {
    pub id: i32,
    pub title: String,
    pub time_minutes: i32,
    #[schema(value_type = String, example = "5.00")]
    pub price: Decimal,
    pub link: Option<String>,
    pub tags: Vec<TagResponse>,
    pub ingredients: Vec<IngredientResponse>,
}

/// Prices always render with two decimal places.
fn display_price(mut price: Decimal) -> Decimal {
    price.rescale(2);
    price
}

impl From<RecipeWithLinks> for RecipeResponse {
    fn from(entry: RecipeWithLinks) -> Self {
        Self {
            id: entry.recipe.id,
            title: entry.recipe.title,
            time_minutes: entry.recipe.time_minutes,
            price: display_price(entry.recipe.price),
            link: entry.recipe.link,
            tags: entry.tag_ids,
            ingredients: entry.ingredient_ids,
        }
    }
}

impl From<RecipeDetail> for RecipeDetailResponse {
    fn from(detail: RecipeDetail) -> Self {
        Self {
            id: detail.recipe.id,
            title: detail.recipe.title,
            time_minutes: detail.recipe.time_minutes,
            price: display_price(detail.recipe.price),
            link: detail.recipe.link,
            tags: detail.tags.into_iter().map(TagResponse::from).collect(),
            ingredients: detail
                .ingredients
                .into_iter()
                .map(IngredientResponse::from)
                .collect(),
        }
    }
}

/// List the caller's recipes, newest first
#[utoipa::path(
    get,
    path = "/api/v1/recipes",
    params(RecipeQuery),
    responses(
        (status = 200, description = "List of recipes", body = ApiResponse<Vec<RecipeResponse>>),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    security(("token_auth" = [])),
    tag = "recipes"
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn get_recipes(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedQuery(query): ValidatedQuery<RecipeQuery>,
) -> Result<Json<ApiResponse<Vec<RecipeResponse>>>, AppError> {
    let filter = query.to_filter()?;
    trace!("Recipe filter: {:?}", filter);

    let recipe_responses: Vec<RecipeResponse> = recipes::list_recipes(&state.db, user.id, &filter)
        .await?
        .into_iter()
        .map(RecipeResponse::from)
        .collect();

    debug!("Successfully fetched {} recipes", recipe_responses.len());
    Ok(Json(ApiResponse::new(
        recipe_responses,
        "Recipes retrieved successfully",
    )))
}

/// Create a recipe owned by the caller
#[utoipa::path(
    post,
    path = "/api/v1/recipes",
    request_body = CreateRecipeRequest,
    responses(
        (status = 201, description = "Recipe created successfully", body = ApiResponse<RecipeDetailResponse>),
        (status = 400, description = "Invalid request data or unknown tag/ingredient", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    security(("token_auth" = [])),
    tag = "recipes"
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn create_recipe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateRecipeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RecipeDetailResponse>>), AppError> {
    let detail = recipes::create_recipe(
        &state.db,
        user.id,
        NewRecipe {
            title: request.title,
            time_minutes: request.time_minutes,
            price: request.price,
            link: request.link,
            tags: request.tags,
            ingredients: request.ingredients,
        },
    )
    .await?;

    info!("Recipe {} created", detail.recipe.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            RecipeDetailResponse::from(detail),
            "Recipe created successfully",
        )),
    ))
}

/// Get a recipe with its tags and ingredients expanded
#[utoipa::path(
    get,
    path = "/api/v1/recipes/{recipe_id}",
    params(
        ("recipe_id" = i32, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Recipe details", body = ApiResponse<RecipeDetailResponse>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(("token_auth" = [])),
    tag = "recipes"
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn get_recipe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    IdPath(recipe_id): IdPath,
) -> Result<Json<ApiResponse<RecipeDetailResponse>>, AppError> {
    let detail = recipes::get_detail(&state.db, user.id, recipe_id).await?;

    Ok(Json(ApiResponse::new(
        RecipeDetailResponse::from(detail),
        "Recipe retrieved successfully",
    )))
}

/// Partially update a recipe
#[utoipa::path(
    patch,
    path = "/api/v1/recipes/{recipe_id}",
    params(
        ("recipe_id" = i32, Path, description = "Recipe ID")
    ),
    request_body = UpdateRecipeRequest,
    responses(
        (status = 200, description = "Recipe updated successfully", body = ApiResponse<RecipeDetailResponse>),
        (status = 400, description = "Invalid request data or unknown tag/ingredient", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(("token_auth" = [])),
    tag = "recipes"
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn update_recipe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    IdPath(recipe_id): IdPath,
    ValidatedJson(request): ValidatedJson<UpdateRecipeRequest>,
) -> Result<Json<ApiResponse<RecipeDetailResponse>>, AppError> {
    let changes = RecipeChanges {
        title: request.title,
        time_minutes: request.time_minutes,
        price: request.price,
        link: request.link.map(Some),
        tags: request.tags,
        ingredients: request.ingredients,
    };
    let detail = recipes::update_recipe(&state.db, user.id, recipe_id, changes).await?;

    Ok(Json(ApiResponse::new(
        RecipeDetailResponse::from(detail),
        "Recipe updated successfully",
    )))
}

/// Delete a recipe
#[utoipa::path(
    delete,
    path = "/api/v1/recipes/{recipe_id}",
    params(
        ("recipe_id" = i32, Path, description = "Recipe ID")
    ),
    responses(
        (status = 204, description = "Recipe deleted successfully"),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(("token_auth" = [])),
    tag = "recipes"
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    IdPath(recipe_id): IdPath,
) -> Result<StatusCode, AppError> {
    recipes::delete_recipe(&state.db, user.id, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
