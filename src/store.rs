//! Persistence operations, one module per entity type.
//!
//! Every function takes the connection explicitly (generic over
//! `ConnectionTrait`) and scopes user-owned rows by the `owner_id` it is
//! given. Callers pass the authenticated user's id, never a client value.

pub mod ingredients;
pub mod recipes;
pub mod tags;
pub mod tokens;
pub mod users;

use crate::error::{AppError, AppResult};

/// Trim a required text field and reject it when nothing is left.
pub(crate) fn required_text(field: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::field(field, "This field may not be blank."));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
pub(crate) mod test_support {
    use migration::{Migrator, MigratorTrait};
    use model::entities::user;
    use sea_orm::{Database, DatabaseConnection};

    use super::users::{self, NewUser};

    pub async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
        db
    }

    pub async fn sample_user(db: &DatabaseConnection, email: &str) -> user::Model {
        users::create_user(
            db,
            NewUser {
                email: email.to_string(),
                password: "myinsecurepassword!".to_string(),
                name: String::new(),
            },
        )
        .await
        .expect("Failed to create sample user")
    }
}
