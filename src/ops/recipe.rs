use crate::database;
use crate::database::models::{
    Ingredient, IngredientId, Recipe, RecipeHandle, RecipeId, RecipeIngredient, RecipeTag, Tag,
    TagId, User, UserId,
};
use crate::error::{OpError, OpResult};
use crate::ops::relations;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::BelongingToDsl as _;
use diesel::Connection as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use std::collections::HashSet;

/// One ingredient-amount line of a recipe being created or updated.
#[derive(Debug, Clone, Copy)]
pub struct IngredientLine {
    pub ingredient_id: IngredientId,
    pub amount: i32,
}

/// Scalar fields of a recipe being created or updated. `image` is required
/// on create; on update `None` keeps the stored image.
#[derive(Debug, Clone)]
pub struct RecipeDraft {
    pub name: String,
    pub image: Option<String>,
    pub description: String,
    pub cooking_time: i32,
}

fn validate_draft(draft: &RecipeDraft) -> OpResult<()> {
    if draft.name.trim().is_empty() {
        return Err(OpError::validation("name", "must not be empty"));
    }
    if draft.cooking_time < 1 {
        return Err(OpError::validation("cooking_time", "must be at least 1"));
    }
    Ok(())
}

fn validate_ingredient_lines(lines: &[IngredientLine]) -> OpResult<()> {
    if lines.is_empty() {
        return Err(OpError::validation(
            "ingredients",
            "at least one ingredient is required",
        ));
    }
    let distinct: HashSet<_> = lines.iter().map(|line| line.ingredient_id).collect();
    if distinct.len() != lines.len() {
        return Err(OpError::validation(
            "ingredients",
            "ingredients must not repeat",
        ));
    }
    if lines.iter().any(|line| line.amount < 1) {
        return Err(OpError::validation(
            "ingredients",
            "amount must be at least 1",
        ));
    }
    Ok(())
}

fn validate_tag_ids(tag_ids: &[TagId]) -> OpResult<()> {
    if tag_ids.is_empty() {
        return Err(OpError::validation("tags", "at least one tag is required"));
    }
    let distinct: HashSet<_> = tag_ids.iter().collect();
    if distinct.len() != tag_ids.len() {
        return Err(OpError::validation("tags", "tags must not repeat"));
    }
    Ok(())
}

/// Ingredient lines are never diffed: the stored set is dropped and the
/// incoming set inserted wholesale.
fn replace_ingredient_lines(
    conn: &mut database::Connection,
    recipe: RecipeId,
    lines: &[IngredientLine],
) -> OpResult<()> {
    use database::schema::recipe_ingredients::dsl::*;
    use diesel::{delete, insert_into};

    delete(recipe_ingredients.filter(recipe_id.eq(recipe))).execute(conn)?;

    let rows: Vec<_> = lines
        .iter()
        .map(|line| {
            (
                recipe_id.eq(recipe),
                ingredient_id.eq(line.ingredient_id),
                amount.eq(line.amount),
            )
        })
        .collect();
    insert_into(recipe_ingredients)
        .values(rows)
        .execute(conn)
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                OpError::NotFound("ingredient")
            }
            other => other.into(),
        })?;
    Ok(())
}

fn replace_tag_links(
    conn: &mut database::Connection,
    recipe: RecipeId,
    tags: &[TagId],
) -> OpResult<()> {
    use database::schema::recipe_tags::dsl::*;
    use diesel::{delete, insert_into};

    delete(recipe_tags.filter(recipe_id.eq(recipe))).execute(conn)?;

    let rows: Vec<_> = tags
        .iter()
        .map(|tag| (recipe_id.eq(recipe), tag_id.eq(*tag)))
        .collect();
    insert_into(recipe_tags)
        .values(rows)
        .execute(conn)
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                OpError::NotFound("tag")
            }
            other => other.into(),
        })?;
    Ok(())
}

pub fn create_recipe(
    conn: &mut database::Connection,
    author: UserId,
    draft: RecipeDraft,
    lines: &[IngredientLine],
    tag_ids: &[TagId],
) -> OpResult<Recipe> {
    validate_draft(&draft)?;
    validate_ingredient_lines(lines)?;
    validate_tag_ids(tag_ids)?;
    let new_image = draft
        .image
        .ok_or_else(|| OpError::validation("image", "required when creating a recipe"))?;

    conn.transaction(|conn| {
        let recipe = {
            use database::schema::recipes::dsl::*;
            use diesel::insert_into;

            insert_into(recipes)
                .values((
                    author_id.eq(author),
                    name.eq(&draft.name),
                    image.eq(&new_image),
                    description.eq(&draft.description),
                    cooking_time.eq(draft.cooking_time),
                ))
                .returning(Recipe::as_returning())
                .get_result(conn)
                .map_err(|e| match e {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        OpError::Conflict("recipe")
                    }
                    DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                        OpError::NotFound("user")
                    }
                    other => other.into(),
                })?
        };
        replace_ingredient_lines(conn, recipe.id, lines)?;
        replace_tag_links(conn, recipe.id, tag_ids)?;
        log::debug!("user {author} created recipe {}", recipe.id);
        Ok(recipe)
    })
}

pub fn update_recipe(
    conn: &mut database::Connection,
    acting_user: UserId,
    recipe: RecipeId,
    draft: RecipeDraft,
    lines: &[IngredientLine],
    tag_ids: &[TagId],
) -> OpResult<Recipe> {
    validate_draft(&draft)?;
    validate_ingredient_lines(lines)?;
    validate_tag_ids(tag_ids)?;

    conn.transaction(|conn| {
        use database::schema::recipes::dsl::*;
        use diesel::update;

        let existing: Recipe = recipes
            .find(recipe)
            .select(Recipe::as_select())
            .get_result(conn)
            .map_err(|e| match e {
                DieselError::NotFound => OpError::NotFound("recipe"),
                other => other.into(),
            })?;
        if existing.author_id != acting_user {
            return Err(OpError::Permission);
        }

        let new_image = draft.image.unwrap_or(existing.image);
        let updated = update(recipes.find(recipe))
            .set((
                name.eq(&draft.name),
                image.eq(&new_image),
                description.eq(&draft.description),
                cooking_time.eq(draft.cooking_time),
            ))
            .returning(Recipe::as_returning())
            .get_result(conn)
            .map_err(|e| match e {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    OpError::Conflict("recipe")
                }
                other => other.into(),
            })?;
        replace_ingredient_lines(conn, recipe, lines)?;
        replace_tag_links(conn, recipe, tag_ids)?;
        Ok(updated)
    })
}

pub fn delete_recipe(
    conn: &mut database::Connection,
    acting_user: UserId,
    recipe: RecipeId,
) -> OpResult<()> {
    use database::schema::recipes::dsl::*;
    use diesel::delete;

    let owner: UserId = recipes
        .find(recipe)
        .select(author_id)
        .get_result(conn)
        .map_err(|e| match e {
            DieselError::NotFound => OpError::NotFound("recipe"),
            other => other.into(),
        })?;
    if owner != acting_user {
        return Err(OpError::Permission);
    }

    delete(recipes.find(recipe)).execute(conn)?;
    log::debug!("user {acting_user} deleted recipe {recipe}");
    Ok(())
}

/// A recipe with every relation materialized, plus the viewer-dependent
/// flags. Both flags are false for an anonymous viewer.
#[derive(Debug)]
pub struct RecipeDetails {
    pub recipe: Recipe,
    pub author: User,
    pub ingredients: Vec<(RecipeIngredient, Ingredient)>,
    pub tags: Vec<Tag>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

pub fn get_recipe(
    conn: &mut database::Connection,
    viewer: Option<UserId>,
    recipe: RecipeId,
) -> OpResult<RecipeDetails> {
    let found: Recipe = {
        use database::schema::recipes::dsl::*;

        recipes
            .find(recipe)
            .select(Recipe::as_select())
            .get_result(conn)
            .map_err(|e| match e {
                DieselError::NotFound => OpError::NotFound("recipe"),
                other => other.into(),
            })?
    };
    let author = {
        use database::schema::users::dsl::*;

        users
            .find(found.author_id)
            .select(User::as_select())
            .get_result(conn)?
    };
    let ingredients = RecipeIngredient::belonging_to(&found)
        .inner_join(database::schema::ingredients::table)
        .select((RecipeIngredient::as_select(), Ingredient::as_select()))
        .order(database::schema::ingredients::dsl::name.asc())
        .load(conn)?;
    let tags = RecipeTag::belonging_to(&found)
        .inner_join(database::schema::tags::table)
        .select(Tag::as_select())
        .order(database::schema::tags::dsl::name.asc())
        .load(conn)?;
    let is_favorited = relations::is_favorited(conn, viewer, recipe)?;
    let is_in_shopping_cart = relations::is_in_cart(conn, viewer, recipe)?;

    Ok(RecipeDetails {
        recipe: found,
        author,
        ingredients,
        tags,
        is_favorited,
        is_in_shopping_cart,
    })
}

/// Listing filters. The favorited/in-cart switches only apply for an
/// authenticated viewer and are ignored otherwise.
#[derive(Default)]
pub struct RecipeListFilter {
    pub author: Option<UserId>,
    pub tag_slugs: Vec<String>,
    pub favorited: bool,
    pub in_shopping_cart: bool,
}

pub fn list_recipes(
    conn: &mut database::Connection,
    viewer: Option<UserId>,
    filter: &RecipeListFilter,
) -> OpResult<Vec<RecipeHandle>> {
    use database::schema::recipes::dsl::*;

    let mut query = recipes
        .select(RecipeHandle::as_select())
        .order((created_at.desc(), id.desc()))
        .into_boxed();

    if let Some(wanted_author) = filter.author {
        query = query.filter(author_id.eq(wanted_author));
    }
    if !filter.tag_slugs.is_empty() {
        let tagged = database::schema::recipe_tags::table
            .inner_join(database::schema::tags::table)
            .filter(database::schema::tags::dsl::slug.eq_any(filter.tag_slugs.clone()))
            .select(database::schema::recipe_tags::dsl::recipe_id);
        query = query.filter(id.eq_any(tagged));
    }
    if let Some(me) = viewer {
        if filter.favorited {
            let favorited = database::schema::favorites::table
                .filter(database::schema::favorites::dsl::user_id.eq(me))
                .select(database::schema::favorites::dsl::recipe_id);
            query = query.filter(id.eq_any(favorited));
        }
        if filter.in_shopping_cart {
            let in_cart = database::schema::shopping_cart_entries::table
                .filter(database::schema::shopping_cart_entries::dsl::user_id.eq(me))
                .select(database::schema::shopping_cart_entries::dsl::recipe_id);
            query = query.filter(id.eq_any(in_cart));
        }
    }

    Ok(query.load(conn)?)
}

pub fn search_recipes(conn: &mut database::Connection, query: &str) -> OpResult<Vec<RecipeHandle>> {
    use database::schema::recipes::dsl::*;
    use diesel::expression_methods::TextExpressionMethods as _;

    Ok(recipes
        .select(RecipeHandle::as_select())
        .filter(name.like(format!("%{query}%")))
        .order(name.asc())
        .load(conn)?)
}
