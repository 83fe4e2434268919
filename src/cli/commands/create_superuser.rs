use anyhow::{Context, Result};
use tracing::info;

use super::initdb::migrate;
use crate::store::users;

pub async fn create_superuser(database_url: &str, email: &str, password: &str) -> Result<()> {
    let db = migrate(database_url).await?;

    let admin = users::create_superuser(&db, email, password)
        .await
        .with_context(|| format!("Failed to create superuser '{}'", email))?;

    info!("Superuser {} created with ID {}", admin.email, admin.id);
    db.close().await?;
    Ok(())
}
