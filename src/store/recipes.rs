use std::collections::HashMap;

use model::entities::{ingredient, recipe, recipe_ingredient, recipe_tag, tag};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Query, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info, instrument, trace};

use super::{ingredients, required_text, tags};
use crate::error::{AppError, AppResult};

/// Data for a new recipe. Tag and ingredient ids must belong to the owner.
#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: Option<String>,
    pub tags: Vec<i32>,
    pub ingredients: Vec<i32>,
}

/// Partial update. `Some` link sets replace the current links entirely.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    /// `Some(None)` clears the link
    pub link: Option<Option<String>>,
    pub tags: Option<Vec<i32>>,
    pub ingredients: Option<Vec<i32>>,
}

/// Recipes linked to any of the given tag or ingredient ids.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub tags: Vec<i32>,
    pub ingredients: Vec<i32>,
}

/// A recipe with the ids of its links, as shown in listings.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeWithLinks {
    pub recipe: recipe::Model,
    pub tag_ids: Vec<i32>,
    pub ingredient_ids: Vec<i32>,
}

/// A recipe with its links expanded.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDetail {
    pub recipe: recipe::Model,
    pub tags: Vec<tag::Model>,
    pub ingredients: Vec<ingredient::Model>,
}

/// Check the price bounds of `DECIMAL(5,2)`: non-negative, at most two
/// decimal places, below 1000.
pub fn check_price(price: &Decimal) -> Result<(), &'static str> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err("Ensure this value is greater than or equal to 0.");
    }
    if price.normalize().scale() > 2 {
        return Err("Ensure that there are no more than 2 decimal places.");
    }
    if *price >= Decimal::ONE_THOUSAND {
        return Err("Ensure that there are no more than 5 digits in total.");
    }
    Ok(())
}

fn check_numbers(time_minutes: Option<i32>, price: Option<&Decimal>) -> AppResult<()> {
    if let Some(minutes) = time_minutes {
        if minutes < 0 {
            return Err(AppError::field(
                "time_minutes",
                "Ensure this value is greater than or equal to 0.",
            ));
        }
    }
    if let Some(price) = price {
        check_price(price).map_err(|message| AppError::field("price", message))?;
    }
    Ok(())
}

fn normalize_link(link: Option<String>) -> Option<String> {
    link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty())
}

fn dedup_ids(ids: &[i32]) -> Vec<i32> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn missing_pk_error(field: &str, wanted: &[i32], found: &[i32]) -> AppError {
    let missing = wanted
        .iter()
        .find(|id| !found.contains(id))
        .copied()
        .unwrap_or_default();
    AppError::field(
        field,
        format!("Invalid pk \"{}\" - object does not exist.", missing),
    )
}

/// Resolve requested tag ids, failing when any is unknown or foreign.
async fn owned_tag_ids<C: ConnectionTrait>(db: &C, owner_id: i32, ids: &[i32]) -> AppResult<Vec<i32>> {
    let wanted = dedup_ids(ids);
    let found: Vec<i32> = tags::find_owned(db, owner_id, &wanted)
        .await?
        .iter()
        .map(|t| t.id)
        .collect();

    if found.len() != wanted.len() {
        return Err(missing_pk_error("tags", &wanted, &found));
    }
    Ok(wanted)
}

async fn owned_ingredient_ids<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    ids: &[i32],
) -> AppResult<Vec<i32>> {
    let wanted = dedup_ids(ids);
    let found: Vec<i32> = ingredients::find_owned(db, owner_id, &wanted)
        .await?
        .iter()
        .map(|i| i.id)
        .collect();

    if found.len() != wanted.len() {
        return Err(missing_pk_error("ingredients", &wanted, &found));
    }
    Ok(wanted)
}

async fn replace_tag_links<C: ConnectionTrait>(db: &C, recipe_id: i32, tag_ids: &[i32]) -> AppResult<()> {
    recipe_tag::Entity::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
        .exec(db)
        .await?;

    if tag_ids.is_empty() {
        return Ok(());
    }

    recipe_tag::Entity::insert_many(tag_ids.iter().map(|tag_id| recipe_tag::ActiveModel {
        recipe_id: Set(recipe_id),
        tag_id: Set(*tag_id),
    }))
    .exec_without_returning(db)
    .await?;

    trace!("Linked recipe {} to tags {:?}", recipe_id, tag_ids);
    Ok(())
}

async fn replace_ingredient_links<C: ConnectionTrait>(
    db: &C,
    recipe_id: i32,
    ingredient_ids: &[i32],
) -> AppResult<()> {
    recipe_ingredient::Entity::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .exec(db)
        .await?;

    if ingredient_ids.is_empty() {
        return Ok(());
    }

    recipe_ingredient::Entity::insert_many(ingredient_ids.iter().map(|ingredient_id| {
        recipe_ingredient::ActiveModel {
            recipe_id: Set(recipe_id),
            ingredient_id: Set(*ingredient_id),
        }
    }))
    .exec_without_returning(db)
    .await?;

    trace!("Linked recipe {} to ingredients {:?}", recipe_id, ingredient_ids);
    Ok(())
}

/// List the owner's recipes, newest first.
///
/// Tag and ingredient filters match recipes linked to any of the given ids;
/// when both are given a recipe has to match each of them.
#[instrument(skip(db))]
pub async fn list_recipes<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    filter: &RecipeFilter,
) -> AppResult<Vec<RecipeWithLinks>> {
    let mut query = recipe::Entity::find().filter(recipe::Column::UserId.eq(owner_id));

    if !filter.tags.is_empty() {
        query = query.filter(
            recipe::Column::Id.in_subquery(
                Query::select()
                    .column(recipe_tag::Column::RecipeId)
                    .from(recipe_tag::Entity)
                    .and_where(recipe_tag::Column::TagId.is_in(filter.tags.iter().copied()))
                    .to_owned(),
            ),
        );
    }
    if !filter.ingredients.is_empty() {
        query = query.filter(
            recipe::Column::Id.in_subquery(
                Query::select()
                    .column(recipe_ingredient::Column::RecipeId)
                    .from(recipe_ingredient::Entity)
                    .and_where(
                        recipe_ingredient::Column::IngredientId
                            .is_in(filter.ingredients.iter().copied()),
                    )
                    .to_owned(),
            ),
        );
    }

    let recipes = query.order_by_desc(recipe::Column::Id).all(db).await?;
    debug!("Found {} recipes for user {}", recipes.len(), owner_id);

    attach_links(db, recipes).await
}

/// Load the link ids of several recipes with one query per join table.
async fn attach_links<C: ConnectionTrait>(
    db: &C,
    recipes: Vec<recipe::Model>,
) -> AppResult<Vec<RecipeWithLinks>> {
    if recipes.is_empty() {
        return Ok(Vec::new());
    }
    let recipe_ids: Vec<i32> = recipes.iter().map(|r| r.id).collect();

    let mut tags_by_recipe: HashMap<i32, Vec<i32>> = HashMap::new();
    for link in recipe_tag::Entity::find()
        .filter(recipe_tag::Column::RecipeId.is_in(recipe_ids.clone()))
        .order_by_asc(recipe_tag::Column::TagId)
        .all(db)
        .await?
    {
        tags_by_recipe.entry(link.recipe_id).or_default().push(link.tag_id);
    }

    let mut ingredients_by_recipe: HashMap<i32, Vec<i32>> = HashMap::new();
    for link in recipe_ingredient::Entity::find()
        .filter(recipe_ingredient::Column::RecipeId.is_in(recipe_ids))
        .order_by_asc(recipe_ingredient::Column::IngredientId)
        .all(db)
        .await?
    {
        ingredients_by_recipe
            .entry(link.recipe_id)
            .or_default()
            .push(link.ingredient_id);
    }

    Ok(recipes
        .into_iter()
        .map(|recipe| RecipeWithLinks {
            tag_ids: tags_by_recipe.remove(&recipe.id).unwrap_or_default(),
            ingredient_ids: ingredients_by_recipe.remove(&recipe.id).unwrap_or_default(),
            recipe,
        })
        .collect())
}

/// Fetch one recipe. Recipes of other users are reported as missing.
pub async fn get_recipe<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    recipe_id: i32,
) -> AppResult<recipe::Model> {
    recipe::Entity::find_by_id(recipe_id)
        .filter(recipe::Column::UserId.eq(owner_id))
        .one(db)
        .await?
        .ok_or(AppError::NotFound("Recipe"))
}

/// Fetch one recipe with its tags and ingredients expanded.
#[instrument(skip(db))]
pub async fn get_detail<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    recipe_id: i32,
) -> AppResult<RecipeDetail> {
    let recipe_model = get_recipe(db, owner_id, recipe_id).await?;

    let tags = recipe_model
        .find_related(tag::Entity)
        .order_by_asc(tag::Column::Id)
        .all(db)
        .await?;
    let ingredients = recipe_model
        .find_related(ingredient::Entity)
        .order_by_asc(ingredient::Column::Id)
        .all(db)
        .await?;

    Ok(RecipeDetail {
        recipe: recipe_model,
        tags,
        ingredients,
    })
}

/// Create a recipe and its links in one transaction.
#[instrument(skip(db, new_recipe), fields(title = %new_recipe.title))]
pub async fn create_recipe<C>(db: &C, owner_id: i32, new_recipe: NewRecipe) -> AppResult<RecipeDetail>
where
    C: ConnectionTrait + TransactionTrait,
{
    let title = required_text("title", &new_recipe.title)?;
    check_numbers(Some(new_recipe.time_minutes), Some(&new_recipe.price))?;

    let txn = db.begin().await?;

    let tag_ids = owned_tag_ids(&txn, owner_id, &new_recipe.tags).await?;
    let ingredient_ids = owned_ingredient_ids(&txn, owner_id, &new_recipe.ingredients).await?;

    let recipe_model = recipe::ActiveModel {
        user_id: Set(owner_id),
        title: Set(title),
        time_minutes: Set(new_recipe.time_minutes),
        price: Set(new_recipe.price),
        link: Set(normalize_link(new_recipe.link)),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    replace_tag_links(&txn, recipe_model.id, &tag_ids).await?;
    replace_ingredient_links(&txn, recipe_model.id, &ingredient_ids).await?;
    txn.commit().await?;

    info!("Created recipe {} for user {}", recipe_model.id, owner_id);
    get_detail(db, owner_id, recipe_model.id).await
}

/// Apply a partial update in one transaction.
#[instrument(skip(db, changes))]
pub async fn update_recipe<C>(
    db: &C,
    owner_id: i32,
    recipe_id: i32,
    changes: RecipeChanges,
) -> AppResult<RecipeDetail>
where
    C: ConnectionTrait + TransactionTrait,
{
    check_numbers(changes.time_minutes, changes.price.as_ref())?;
    let title = changes
        .title
        .as_deref()
        .map(|title| required_text("title", title))
        .transpose()?;

    let txn = db.begin().await?;
    let existing = get_recipe(&txn, owner_id, recipe_id).await?;

    let tag_ids = match &changes.tags {
        Some(ids) => Some(owned_tag_ids(&txn, owner_id, ids).await?),
        None => None,
    };
    let ingredient_ids = match &changes.ingredients {
        Some(ids) => Some(owned_ingredient_ids(&txn, owner_id, ids).await?),
        None => None,
    };

    let mut active_recipe: recipe::ActiveModel = existing.into();
    if let Some(title) = title {
        active_recipe.title = Set(title);
    }
    if let Some(minutes) = changes.time_minutes {
        active_recipe.time_minutes = Set(minutes);
    }
    if let Some(price) = changes.price {
        active_recipe.price = Set(price);
    }
    if let Some(link) = changes.link {
        active_recipe.link = Set(normalize_link(link));
    }
    if active_recipe.is_changed() {
        active_recipe.update(&txn).await?;
    }

    if let Some(tag_ids) = tag_ids {
        replace_tag_links(&txn, recipe_id, &tag_ids).await?;
    }
    if let Some(ingredient_ids) = ingredient_ids {
        replace_ingredient_links(&txn, recipe_id, &ingredient_ids).await?;
    }
    txn.commit().await?;

    info!("Updated recipe {} of user {}", recipe_id, owner_id);
    get_detail(db, owner_id, recipe_id).await
}

/// Delete a recipe. Link rows go with it; the tags and ingredients stay.
#[instrument(skip(db))]
pub async fn delete_recipe<C: ConnectionTrait>(db: &C, owner_id: i32, recipe_id: i32) -> AppResult<()> {
    let existing = get_recipe(db, owner_id, recipe_id).await?;
    existing.delete(db).await?;

    info!("Deleted recipe {} of user {}", recipe_id, owner_id);
    Ok(())
}
