//! Token authentication middleware with user caching
//!
//! Protected routes are wrapped in [`require_auth`], which resolves the
//! `Authorization` header to a user before any handler runs and inserts an
//! [`AuthenticatedUser`] into the request extensions.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use model::entities::user;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::error::{AppError, AppResult};
use crate::schemas::AppState;
use crate::store::tokens;

/// Authorization schemes accepted in front of the token key.
const TOKEN_SCHEMES: [&str; 2] = ["Token", "Bearer"];

/// Authenticated user extracted from the request token
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    /// Digest of the token this request presented
    #[serde(skip)]
    pub token_hash: String,
}

impl AuthenticatedUser {
    pub fn from_model(user: user::Model, token_hash: String) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            token_hash,
        }
    }
}

/// Pull the token key out of an `Authorization: Token <key>` header.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, key) = value.trim().split_once(' ')?;

    if !TOKEN_SCHEMES
        .iter()
        .any(|accepted| accepted.eq_ignore_ascii_case(scheme))
    {
        return None;
    }

    let key = key.trim();
    if key.is_empty() || key.contains(' ') {
        return None;
    }
    Some(key)
}

/// Resolve a presented token to its user, consulting the cache first.
pub async fn authenticate(state: &AppState, token: &str) -> AppResult<AuthenticatedUser> {
    let token_hash = tokens::hash_token(token);

    if let Some(cached) = state.token_cache.get(&token_hash).await {
        trace!("Token cache hit for user {}", cached.id);
        return Ok(cached);
    }

    let user = match tokens::find_user_by_token_hash(&state.db, &token_hash).await? {
        Some(user) if user.is_active => user,
        Some(user) => {
            warn!("Rejected token for inactive user {}", user.id);
            return Err(AppError::Unauthenticated);
        }
        None => {
            debug!("Presented token is unknown");
            return Err(AppError::Unauthenticated);
        }
    };

    remember(state, AuthenticatedUser::from_model(user, token_hash)).await
}

/// Cache a resolved token, then confirm the token row still exists.
///
/// A logout deletes the row before invalidating the cache, so an entry
/// inserted here either gets invalidated by that logout or sees the row gone.
async fn remember(
    state: &AppState,
    authenticated: AuthenticatedUser,
) -> AppResult<AuthenticatedUser> {
    let token_hash = authenticated.token_hash.clone();
    state
        .token_cache
        .insert(token_hash.clone(), authenticated.clone())
        .await;

    if !tokens::token_exists(&state.db, &token_hash).await? {
        debug!("Token of user {} was revoked while authenticating", authenticated.id);
        state.token_cache.invalidate(&token_hash).await;
        return Err(AppError::Unauthenticated);
    }

    Ok(authenticated)
}

/// Drop every cached token of a user, e.g. after a profile change.
pub fn forget_user(state: &AppState, user_id: i32) {
    if let Err(e) = state
        .token_cache
        .invalidate_entries_if(move |_, cached| cached.id == user_id)
    {
        warn!("Failed to invalidate cached tokens for user {}: {}", user_id, e);
    }
}

/// Token authentication middleware
///
/// Returns 401 before the handler runs when the token is missing,
/// malformed, unknown or belongs to an inactive user.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let token = extract_token(request.headers())
        .ok_or(AppError::Unauthenticated)?
        .to_string();

    let user = authenticate(&state, &token).await?;
    trace!("Authenticated request for user {}", user.id);

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
