use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use model::entities::user;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set, SqlErr,
};
use tracing::{debug, info, instrument, warn};

use crate::error::{AppError, AppResult};

/// Data needed to register a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Profile fields a user may change about themselves.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub password: Option<String>,
}

/// Emails are compared and stored in lowercase without surrounding whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hash a password with Argon2 and a fresh random salt (PHC string format).
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verifies a password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::Internal(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}

fn duplicate_email_error() -> AppError {
    AppError::field("email", "A user with this email already exists.")
}

fn map_insert_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => duplicate_email_error(),
        _ => AppError::Database(err),
    }
}

/// Create a regular user.
#[instrument(skip(db, new_user), fields(email = %new_user.email))]
pub async fn create_user<C: ConnectionTrait>(db: &C, new_user: NewUser) -> AppResult<user::Model> {
    insert_user(db, new_user, false).await
}

/// Create a user with the staff and superuser flags set.
#[instrument(skip(db, password))]
pub async fn create_superuser<C: ConnectionTrait>(
    db: &C,
    email: &str,
    password: &str,
) -> AppResult<user::Model> {
    let new_user = NewUser {
        email: email.to_string(),
        password: password.to_string(),
        name: String::new(),
    };
    insert_user(db, new_user, true).await
}

async fn insert_user<C: ConnectionTrait>(
    db: &C,
    new_user: NewUser,
    superuser: bool,
) -> AppResult<user::Model> {
    let email = normalize_email(&new_user.email);
    if email.is_empty() {
        warn!("Rejected user without an email address");
        return Err(AppError::field("email", "Users must have an email address."));
    }

    if find_by_email(db, &email).await?.is_some() {
        warn!("User with email {} already exists", email);
        return Err(duplicate_email_error());
    }

    let password_hash = hash_password(&new_user.password)?;

    let user_model = user::ActiveModel {
        email: Set(email),
        name: Set(new_user.name.trim().to_string()),
        password_hash: Set(password_hash),
        is_active: Set(true),
        is_staff: Set(superuser),
        is_superuser: Set(superuser),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(map_insert_error)?;

    info!(
        "Created user {} (id {}, superuser: {})",
        user_model.email, user_model.id, superuser
    );
    Ok(user_model)
}

/// Look a user up by email, normalizing it first.
pub async fn find_by_email<C: ConnectionTrait>(db: &C, email: &str) -> AppResult<Option<user::Model>> {
    let user_model = user::Entity::find()
        .filter(user::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await?;
    Ok(user_model)
}

pub async fn get_user<C: ConnectionTrait>(db: &C, user_id: i32) -> AppResult<user::Model> {
    user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("User"))
}

/// Check an email/password pair.
///
/// Every failure (blank input, unknown email, inactive account, wrong
/// password) yields the same `InvalidCredentials` error.
#[instrument(skip(db, password))]
pub async fn verify_credentials<C: ConnectionTrait>(
    db: &C,
    email: &str,
    password: &str,
) -> AppResult<user::Model> {
    if email.trim().is_empty() || password.is_empty() {
        debug!("Credentials missing email or password");
        return Err(AppError::InvalidCredentials);
    }

    let Some(user_model) = find_by_email(db, email).await? else {
        debug!("No user for the given email");
        return Err(AppError::InvalidCredentials);
    };

    if !user_model.is_active {
        warn!("Login attempt for inactive user {}", user_model.id);
        return Err(AppError::InvalidCredentials);
    }

    if !verify_password(password, &user_model.password_hash)? {
        debug!("Password mismatch for user {}", user_model.id);
        return Err(AppError::InvalidCredentials);
    }

    Ok(user_model)
}

/// Apply profile changes. A new password is hashed before storing.
#[instrument(skip(db, changes))]
pub async fn update_user<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    changes: UserChanges,
) -> AppResult<user::Model> {
    let existing = get_user(db, user_id).await?;
    let mut active_user: user::ActiveModel = existing.clone().into();

    if let Some(name) = changes.name {
        active_user.name = Set(name.trim().to_string());
    }
    if let Some(password) = changes.password {
        active_user.password_hash = Set(hash_password(&password)?);
    }

    if !active_user.is_changed() {
        return Ok(existing);
    }

    let updated = active_user.update(db).await?;
    info!("Updated profile of user {}", updated.id);
    Ok(updated)
}
