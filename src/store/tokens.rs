use chrono::Utc;
use model::entities::{auth_token, user};
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use sha2::{Digest, Sha256};
use tracing::{info, instrument};

use super::users;
use crate::error::AppResult;

/// Random bytes per token; the key handed out is their hex encoding.
const TOKEN_BYTES: usize = 20;

/// Generate a new opaque token key (40 lowercase hex characters).
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Hashes a token using SHA-256 for storage and lookups
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Exchange valid credentials for a newly issued token.
///
/// Every call issues a fresh token; tokens issued earlier stay valid until
/// revoked.
#[instrument(skip(db, password))]
pub async fn issue_token<C: ConnectionTrait>(
    db: &C,
    email: &str,
    password: &str,
) -> AppResult<(String, user::Model)> {
    let user_model = users::verify_credentials(db, email, password).await?;

    let token = generate_token();
    auth_token::ActiveModel {
        user_id: Set(user_model.id),
        token_hash: Set(hash_token(&token)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Issued token for user {}", user_model.id);
    Ok((token, user_model))
}

/// Find the user a token digest belongs to.
pub async fn find_user_by_token_hash<C: ConnectionTrait>(
    db: &C,
    token_hash: &str,
) -> AppResult<Option<user::Model>> {
    let found = auth_token::Entity::find()
        .filter(auth_token::Column::TokenHash.eq(token_hash))
        .find_also_related(user::Entity)
        .one(db)
        .await?;

    Ok(found.and_then(|(_, user_model)| user_model))
}

/// Whether a token with this digest is still on record.
pub async fn token_exists<C: ConnectionTrait>(db: &C, token_hash: &str) -> AppResult<bool> {
    let count = auth_token::Entity::find()
        .filter(auth_token::Column::TokenHash.eq(token_hash))
        .count(db)
        .await?;

    Ok(count > 0)
}

/// Delete a token by digest. Returns whether a token was removed.
#[instrument(skip(db, token_hash))]
pub async fn revoke_token_hash<C: ConnectionTrait>(db: &C, token_hash: &str) -> AppResult<bool> {
    let result = auth_token::Entity::delete_many()
        .filter(auth_token::Column::TokenHash.eq(token_hash))
        .exec(db)
        .await?;

    Ok(result.rows_affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::store::test_support::{sample_user, setup_db};

    #[test]
    fn test_generate_token_format() {
        let token = generate_token();

        assert_eq!(token.len(), 40);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_hash_token_is_stable() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
        assert_eq!(hash_token("abc").len(), 64);
    }

    #[tokio::test]
    async fn test_issue_token_for_valid_credentials() {
        let db = setup_db().await;
        let created = sample_user(&db, "test@gmail.com").await;

        let (token, issued_for) = issue_token(&db, "test@gmail.com", "myinsecurepassword!")
            .await
            .unwrap();

        assert_eq!(issued_for.id, created.id);
        let resolved = find_user_by_token_hash(&db, &hash_token(&token))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.id, created.id);

        // The plaintext key is never stored
        let stored = auth_token::Entity::find().all(&db).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_ne!(stored[0].token_hash, token);
    }

    #[tokio::test]
    async fn test_each_login_issues_a_new_valid_token() {
        let db = setup_db().await;
        let created = sample_user(&db, "test@gmail.com").await;

        let (first, _) = issue_token(&db, "test@gmail.com", "myinsecurepassword!")
            .await
            .unwrap();
        let (second, _) = issue_token(&db, "TEST@gmail.com", "myinsecurepassword!")
            .await
            .unwrap();

        assert_ne!(first, second);
        for token in [&first, &second] {
            let resolved = find_user_by_token_hash(&db, &hash_token(token)).await.unwrap();
            assert_eq!(resolved.map(|u| u.id), Some(created.id));
        }
    }

    #[tokio::test]
    async fn test_issue_token_invalid_credentials() {
        let db = setup_db().await;
        sample_user(&db, "test@gmail.com").await;

        let result = issue_token(&db, "test@gmail.com", "mywronginsecurepassword").await;

        assert!(matches!(result, Err(AppError::InvalidCredentials)));
        assert!(auth_token::Entity::find().all(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_revoke_token() {
        let db = setup_db().await;
        sample_user(&db, "test@gmail.com").await;
        let (token, _) = issue_token(&db, "test@gmail.com", "myinsecurepassword!")
            .await
            .unwrap();
        let token_hash = hash_token(&token);

        assert!(revoke_token_hash(&db, &token_hash).await.unwrap());
        assert!(!revoke_token_hash(&db, &token_hash).await.unwrap());
        assert!(find_user_by_token_hash(&db, &token_hash).await.unwrap().is_none());
    }
}
