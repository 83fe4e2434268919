use crate::auth::require_auth;
use crate::handlers::{
    health::health_check,
    ingredients::{create_ingredient, delete_ingredient, get_ingredient, get_ingredients, update_ingredient},
    recipes::{create_recipe, delete_recipe, get_recipe, get_recipes, update_recipe},
    tags::{create_tag, delete_tag, get_tag, get_tags, update_tag},
    users::{create_token, create_user, get_me, revoke_token, update_me},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let request_timeout = state.settings.request_timeout();

    // Everything here requires `Authorization: Token <key>`
    let protected = Router::new()
        // Current user
        .route("/api/v1/users/me", get(get_me).patch(update_me))
        .route("/api/v1/users/me/token", delete(revoke_token))
        // Tag routes
        .route("/api/v1/tags", get(get_tags).post(create_tag))
        .route(
            "/api/v1/tags/:tag_id",
            get(get_tag).patch(update_tag).delete(delete_tag),
        )
        // Ingredient routes
        .route("/api/v1/ingredients", get(get_ingredients).post(create_ingredient))
        .route(
            "/api/v1/ingredients/:ingredient_id",
            get(get_ingredient)
                .patch(update_ingredient)
                .delete(delete_ingredient),
        )
        // Recipe routes
        .route("/api/v1/recipes", get(get_recipes).post(create_recipe))
        .route(
            "/api/v1/recipes/:recipe_id",
            get(get_recipe).patch(update_recipe).delete(delete_recipe),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Registration and login
        .route("/api/v1/users", post(create_user))
        .route("/api/v1/users/token", post(create_token))
        .merge(protected)
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
