#[cfg(test)]
pub mod test_utils {
    use crate::config::{build_token_cache, Settings};
    use crate::router::create_router;
    use crate::schemas::{ApiResponse, AppState};
    use axum::http::{header, HeaderName, HeaderValue, StatusCode};
    use axum::Router;
    use axum_test::TestServer;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{Database, DatabaseConnection};
    use serde_json::{json, Value};
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    pub const TEST_PASSWORD: &str = "myinsecurepassword!";

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        // Run migrations
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    /// Create AppState for testing
    pub async fn setup_test_app_state() -> AppState {
        let db = setup_test_db().await;
        let settings = Settings::default();
        let token_cache = build_token_cache(&settings);

        AppState {
            db,
            token_cache,
            settings,
        }
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The log level comes from RUST_LOG and defaults to WARN.
    fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| level.parse::<Level>().ok())
            .unwrap_or(Level::WARN);

        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Create axum app for testing
    pub async fn setup_test_app() -> Router {
        let _guard = init_test_tracing();
        let state = setup_test_app_state().await;
        create_router(state)
    }

    pub async fn setup_test_server() -> TestServer {
        TestServer::new(setup_test_app().await).expect("Failed to start test server")
    }

    /// `Authorization: Token <key>` header for the given token.
    pub fn auth_header(token: &str) -> (HeaderName, HeaderValue) {
        let value = HeaderValue::from_str(&format!("Token {}", token))
            .expect("Token is a valid header value");
        (header::AUTHORIZATION, value)
    }

    /// Register a user and return their id.
    pub async fn register(server: &TestServer, email: &str) -> i64 {
        let response = server
            .post("/api/v1/users")
            .json(&json!({
                "email": email,
                "password": TEST_PASSWORD,
                "name": "Test name",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let body: ApiResponse<Value> = response.json();
        body.data["id"].as_i64().expect("User id in response")
    }

    /// Log in and return the issued token.
    pub async fn login(server: &TestServer, email: &str) -> String {
        let response = server
            .post("/api/v1/users/token")
            .json(&json!({ "email": email, "password": TEST_PASSWORD }))
            .await;
        response.assert_status(StatusCode::OK);

        let body: ApiResponse<Value> = response.json();
        body.data["token"]
            .as_str()
            .expect("Token in response")
            .to_string()
    }

    /// Register a user and return a token for them.
    pub async fn register_and_login(server: &TestServer, email: &str) -> String {
        register(server, email).await;
        login(server, email).await
    }
}
