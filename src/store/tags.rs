use model::entities::{recipe, recipe_tag, tag};
use sea_orm::{
    sea_query::{Expr, Query},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::{debug, info, instrument};

use super::required_text;
use crate::error::{AppError, AppResult};

/// List the owner's tags, name descending.
///
/// With `assigned_only`, only tags linked to at least one of the owner's
/// recipes are returned. The subquery keeps each tag once no matter how
/// many recipes reference it.
#[instrument(skip(db))]
pub async fn list_tags<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    assigned_only: bool,
) -> AppResult<Vec<tag::Model>> {
    let mut query = tag::Entity::find().filter(tag::Column::UserId.eq(owner_id));

    if assigned_only {
        query = query.filter(
            tag::Column::Id.in_subquery(
                Query::select()
                    .column(recipe_tag::Column::TagId)
                    .from(recipe_tag::Entity)
                    .inner_join(
                        recipe::Entity,
                        Expr::col((recipe::Entity, recipe::Column::Id))
                            .equals((recipe_tag::Entity, recipe_tag::Column::RecipeId)),
                    )
                    .and_where(Expr::col((recipe::Entity, recipe::Column::UserId)).eq(owner_id))
                    .to_owned(),
            ),
        );
    }

    let tags = query
        .order_by_desc(tag::Column::Name)
        .order_by_desc(tag::Column::Id)
        .all(db)
        .await?;

    debug!("Found {} tags for user {}", tags.len(), owner_id);
    Ok(tags)
}

#[instrument(skip(db))]
pub async fn create_tag<C: ConnectionTrait>(db: &C, owner_id: i32, name: &str) -> AppResult<tag::Model> {
    let name = required_text("name", name)?;

    let tag_model = tag::ActiveModel {
        user_id: Set(owner_id),
        name: Set(name),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Created tag {} for user {}", tag_model.id, owner_id);
    Ok(tag_model)
}

/// Fetch one tag. Tags of other users are reported as missing.
pub async fn get_tag<C: ConnectionTrait>(db: &C, owner_id: i32, tag_id: i32) -> AppResult<tag::Model> {
    tag::Entity::find_by_id(tag_id)
        .filter(tag::Column::UserId.eq(owner_id))
        .one(db)
        .await?
        .ok_or(AppError::NotFound("Tag"))
}

/// Fetch the subset of `ids` owned by `owner_id`.
pub async fn find_owned<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    ids: &[i32],
) -> AppResult<Vec<tag::Model>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let tags = tag::Entity::find()
        .filter(tag::Column::UserId.eq(owner_id))
        .filter(tag::Column::Id.is_in(ids.iter().copied()))
        .all(db)
        .await?;
    Ok(tags)
}

#[instrument(skip(db))]
pub async fn update_tag<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    tag_id: i32,
    name: Option<&str>,
) -> AppResult<tag::Model> {
    let existing = get_tag(db, owner_id, tag_id).await?;
    let Some(name) = name else {
        return Ok(existing);
    };

    let mut active_tag: tag::ActiveModel = existing.into();
    active_tag.name = Set(required_text("name", name)?);
    let updated = active_tag.update(db).await?;

    info!("Updated tag {}", updated.id);
    Ok(updated)
}

/// Delete a tag. Its recipe links go with it.
#[instrument(skip(db))]
pub async fn delete_tag<C: ConnectionTrait>(db: &C, owner_id: i32, tag_id: i32) -> AppResult<()> {
    let existing = get_tag(db, owner_id, tag_id).await?;
    existing.delete(db).await?;

    info!("Deleted tag {} of user {}", tag_id, owner_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{sample_user, setup_db};
    use rust_decimal::Decimal;

    async fn recipe_for(db: &sea_orm::DatabaseConnection, owner_id: i32, title: &str) -> recipe::Model {
        recipe::ActiveModel {
            user_id: Set(owner_id),
            title: Set(title.to_string()),
            time_minutes: Set(10),
            price: Set(Decimal::new(500, 2)),
            link: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    async fn link(db: &sea_orm::DatabaseConnection, recipe_id: i32, tag_id: i32) {
        recipe_tag::ActiveModel {
            recipe_id: Set(recipe_id),
            tag_id: Set(tag_id),
        }
        .insert(db)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_list_tags_ordered_and_scoped() {
        let db = setup_db().await;
        let user = sample_user(&db, "test@gmail.com").await;
        let other = sample_user(&db, "other@gmail.com").await;

        create_tag(&db, user.id, "Vegan").await.unwrap();
        create_tag(&db, user.id, "Dessert").await.unwrap();
        create_tag(&db, other.id, "Fruity").await.unwrap();

        let names: Vec<String> = list_tags(&db, user.id, false)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();

        assert_eq!(names, vec!["Vegan", "Dessert"]);
    }

    #[tokio::test]
    async fn test_create_tag_trims_and_rejects_blank() {
        let db = setup_db().await;
        let user = sample_user(&db, "test@gmail.com").await;

        let created = create_tag(&db, user.id, "  Vegan  ").await.unwrap();
        assert_eq!(created.name, "Vegan");
        assert_eq!(created.to_string(), "Vegan");

        let result = create_tag(&db, user.id, "").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(list_tags(&db, user.id, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_assigned_only_is_unique() {
        let db = setup_db().await;
        let user = sample_user(&db, "test@gmail.com").await;

        let breakfast = create_tag(&db, user.id, "Breakfast").await.unwrap();
        create_tag(&db, user.id, "Lunch").await.unwrap();

        let pancakes = recipe_for(&db, user.id, "Pancakes").await;
        let porridge = recipe_for(&db, user.id, "Porridge").await;
        link(&db, pancakes.id, breakfast.id).await;
        link(&db, porridge.id, breakfast.id).await;

        let assigned = list_tags(&db, user.id, true).await.unwrap();

        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].id, breakfast.id);
    }

    #[tokio::test]
    async fn test_assigned_only_ignores_other_users_recipes() {
        let db = setup_db().await;
        let user = sample_user(&db, "test@gmail.com").await;
        let other = sample_user(&db, "other@gmail.com").await;

        let tag_model = create_tag(&db, user.id, "Breakfast").await.unwrap();
        let foreign = recipe_for(&db, other.id, "Foreign").await;
        link(&db, foreign.id, tag_model.id).await;

        assert!(list_tags(&db, user.id, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_other_users_tag_is_not_found() {
        let db = setup_db().await;
        let user = sample_user(&db, "test@gmail.com").await;
        let other = sample_user(&db, "other@gmail.com").await;
        let foreign = create_tag(&db, other.id, "Fruity").await.unwrap();

        assert!(matches!(
            get_tag(&db, user.id, foreign.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            update_tag(&db, user.id, foreign.id, Some("Mine")).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            delete_tag(&db, user.id, foreign.id).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(get_tag(&db, other.id, foreign.id).await.unwrap().name, "Fruity");
    }

    #[tokio::test]
    async fn test_update_and_delete_tag() {
        let db = setup_db().await;
        let user = sample_user(&db, "test@gmail.com").await;
        let created = create_tag(&db, user.id, "After Dinner").await.unwrap();

        let updated = update_tag(&db, user.id, created.id, Some("Dessert")).await.unwrap();
        assert_eq!(updated.name, "Dessert");

        delete_tag(&db, user.id, created.id).await.unwrap();
        assert!(list_tags(&db, user.id, false).await.unwrap().is_empty());
    }
}
