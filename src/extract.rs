use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use serde_path_to_error::Segment;
use std::fmt::Display;
use tracing::debug;
use validator::Validate;

use crate::error::AppError;

/// Key for errors that cannot be tied to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Turn a deserialization failure into a validation error keyed by the
/// top-level field it happened in.
fn deserialize_error<E: Display>(error: serde_path_to_error::Error<E>) -> AppError {
    let field = match error.path().iter().next() {
        Some(Segment::Map { key }) => key.clone(),
        _ => NON_FIELD_ERRORS.to_string(),
    };
    AppError::field(&field, error.into_inner().to_string())
}

/// JSON body that is deserialized and then validated.
///
/// Malformed bodies and failed validation both surface as
/// [`AppError::Validation`], so clients always get a 400 with field detail.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<serde_json::Value>::from_request(req, state)
            .await
            .map_err(|rejection| {
                debug!("Rejected request body: {}", rejection.body_text());
                AppError::field(NON_FIELD_ERRORS, rejection.body_text())
            })?;

        let value: T = serde_path_to_error::deserialize(body).map_err(|error| {
            debug!("Request body does not match the expected shape: {}", error);
            deserialize_error(error)
        })?;

        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Query string that is deserialized and then validated.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = parts.uri.query().unwrap_or_default();
        let deserializer =
            serde_urlencoded::Deserializer::new(form_urlencoded::parse(query.as_bytes()));

        let value: T = serde_path_to_error::deserialize(deserializer).map_err(|error| {
            debug!("Rejected query string {:?}: {}", query, error);
            deserialize_error(error)
        })?;

        value.validate()?;
        Ok(ValidatedQuery(value))
    }
}

/// Numeric id taken from the request path.
///
/// An id that is not a number cannot name any row, so it is reported as 404
/// like any other unknown id.
#[derive(Debug, Clone, Copy)]
pub struct IdPath(pub i32);

#[async_trait]
impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i32>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                debug!("Rejected path id: {}", rejection.body_text());
                AppError::NotFound("Object")
            })?;

        Ok(IdPath(id))
    }
}
