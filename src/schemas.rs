use crate::auth::AuthenticatedUser;
use crate::config::Settings;
use crate::error::FieldErrors;
use moka::future::Cache;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    IntoParams, Modify, OpenApi, ToSchema,
};
use validator::Validate;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Resolved users keyed by token digest
    pub token_cache: Cache<String, AuthenticatedUser>,
    /// Runtime settings
    pub settings: Settings,
}

/// Query parameters shared by the tag and ingredient listings
#[derive(Debug, Default, Deserialize, Validate, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AssignedOnlyQuery {
    /// When 1, only return entries linked to at least one of the caller's recipes
    #[validate(range(min = 0, max = 1))]
    pub assigned_only: Option<u8>,
}

impl AssignedOnlyQuery {
    pub fn is_set(&self) -> bool {
        self.assigned_only == Some(1)
    }
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            success: true,
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
    /// Per-field messages, present on validation errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Registers the `Authorization: Token <key>` scheme on the document.
struct TokenAuthAddon;

impl Modify for TokenAuthAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "token_auth",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "Authorization",
                    "Token issued by POST /api/v1/users/token, sent as `Token <key>`",
                ))),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::users::create_user,
        crate::handlers::users::create_token,
        crate::handlers::users::get_me,
        crate::handlers::users::update_me,
        crate::handlers::users::revoke_token,
        crate::handlers::tags::get_tags,
        crate::handlers::tags::create_tag,
        crate::handlers::tags::get_tag,
        crate::handlers::tags::update_tag,
        crate::handlers::tags::delete_tag,
        crate::handlers::ingredients::get_ingredients,
        crate::handlers::ingredients::create_ingredient,
        crate::handlers::ingredients::get_ingredient,
        crate::handlers::ingredients::update_ingredient,
        crate::handlers::ingredients::delete_ingredient,
        crate::handlers::recipes::get_recipes,
        crate::handlers::recipes::create_recipe,
        crate::handlers::recipes::get_recipe,
        crate::handlers::recipes::update_recipe,
        crate::handlers::recipes::delete_recipe,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            crate::handlers::users::CreateUserRequest,
            crate::handlers::users::UpdateUserRequest,
            crate::handlers::users::TokenRequest,
            crate::handlers::users::TokenResponse,
            crate::handlers::users::UserResponse,
            crate::handlers::tags::CreateTagRequest,
            crate::handlers::tags::UpdateTagRequest,
            crate::handlers::tags::TagResponse,
            crate::handlers::ingredients::CreateIngredientRequest,
            crate::handlers::ingredients::UpdateIngredientRequest,
            crate::handlers::ingredients::IngredientResponse,
            crate::handlers::recipes::CreateRecipeRequest,
            crate::handlers::recipes::UpdateRecipeRequest,
            crate::handlers::recipes::RecipeResponse,
            crate::handlers::recipes::RecipeDetailResponse,
        )
    ),
    modifiers(&TokenAuthAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "Registration, tokens and profile"),
        (name = "tags", description = "Recipe tags owned by the caller"),
        (name = "ingredients", description = "Ingredients owned by the caller"),
        (name = "recipes", description = "Recipes owned by the caller"),
    ),
    info(
        title = "Recipebook API",
        description = "Recipe management API - users keep their own recipes, tags and ingredients",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
