use model::entities::{ingredient, recipe, recipe_ingredient};
use sea_orm::{
    sea_query::{Expr, Query},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::{debug, info, instrument};

use super::required_text;
use crate::error::{AppError, AppResult};

/// List the owner's ingredients, name descending.
///
/// With `assigned_only`, only ingredients linked to at least one of the owner's
/// recipes are returned. The subquery keeps each ingredient once no matter how
/// many recipes reference it.
#[instrument(skip(db))]
pub async fn list_ingredients<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    assigned_only: bool,
) -> AppResult<Vec<ingredient::Model>> {
    let mut query = ingredient::Entity::find().filter(ingredient::Column::UserId.eq(owner_id));

    if assigned_only {
        query = query.filter(
            ingredient::Column::Id.in_subquery(
                Query::select()
                    .column(recipe_ingredient::Column::IngredientId)
                    .from(recipe_ingredient::Entity)
                    .inner_join(
                        recipe::Entity,
                        Expr::col((recipe::Entity, recipe::Column::Id))
                            .equals((recipe_ingredient::Entity, recipe_ingredient::Column::RecipeId)),
                    )
                    .and_where(Expr::col((recipe::Entity, recipe::Column::UserId)).eq(owner_id))
                    .to_owned(),
            ),
        );
    }

    let ingredients = query
        .order_by_desc(ingredient::Column::Name)
        .order_by_desc(ingredient::Column::Id)
        .all(db)
        .await?;

    debug!("Found {} ingredients for user {}", ingredients.len(), owner_id);
    Ok(ingredients)
}

#[instrument(skip(db))]
pub async fn create_ingredient<C: ConnectionTrait>(db: &C, owner_id: i32, name: &str) -> AppResult<ingredient::Model> {
    let name = required_text("name", name)?;

    let ingredient_model = ingredient::ActiveModel {
        user_id: Set(owner_id),
        name: Set(name),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Created ingredient {} for user {}", ingredient_model.id, owner_id);
    Ok(ingredient_model)
}

/// Fetch one ingredient. Ingredients of other users are reported as missing.
pub async fn get_ingredient<C: ConnectionTrait>(db: &C, owner_id: i32, ingredient_id: i32) -> AppResult<ingredient::Model> {
    ingredient::Entity::find_by_id(ingredient_id)
        .filter(ingredient::Column::UserId.eq(owner_id))
        .one(db)
        .await?
        .ok_or(AppError::NotFound("Ingredient"))
}

/// Fetch the subset of `ids` owned by `owner_id`.
pub async fn find_owned<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    ids: &[i32],
) -> AppResult<Vec<ingredient::Model>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let ingredients = ingredient::Entity::find()
        .filter(ingredient::Column::UserId.eq(owner_id))
        .filter(ingredient::Column::Id.is_in(ids.iter().copied()))
        .all(db)
        .await?;
    Ok(ingredients)
}

#[instrument(skip(db))]
pub async fn update_ingredient<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    ingredient_id: i32,
    name: Option<&str>,
) -> AppResult<ingredient::Model> {
    let existing = get_ingredient(db, owner_id, ingredient_id).await?;
    let Some(name) = name else {
        return Ok(existing);
    };

    let mut active_ingredient: ingredient::ActiveModel = existing.into();
    active_ingredient.name = Set(required_text("name", name)?);
    let updated = active_ingredient.update(db).await?;

    info!("Updated ingredient {}", updated.id);
    Ok(updated)
}

/// Delete a ingredient. Its recipe links go with it.
#[instrument(skip(db))]
pub async fn delete_ingredient<C: ConnectionTrait>(db: &C, owner_id: i32, ingredient_id: i32) -> AppResult<()> {
    let existing = get_ingredient(db, owner_id, ingredient_id).await?;
    existing.delete(db).await?;

    info!("Deleted ingredient {} of user {}", ingredient_id, owner_id);
    Ok(())
}
