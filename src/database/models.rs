// Copyright 2023 Remi Bernotavicius

use chrono::NaiveDateTime;
use derive_more::Display;
use diesel::associations::{Associations, Identifiable};
use diesel::deserialize::Queryable;
use diesel::expression::Selectable;
use diesel::prelude::Insertable;
use diesel_derive_newtype::DieselNewType;

#[derive(DieselNewType, Display, Debug, Hash, PartialEq, Eq, Copy, Clone)]
pub struct UserId(i32);

impl UserId {
    pub fn new(id: i32) -> Self {
        Self(id)
    }
}

#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, Clone)]
#[diesel(table_name = crate::database::schema::users)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
}

#[derive(DieselNewType, Display, Debug, Hash, PartialEq, Eq, Copy, Clone)]
pub struct IngredientId(i32);

#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, Clone)]
#[diesel(table_name = crate::database::schema::ingredients)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(DieselNewType, Display, Debug, Hash, PartialEq, Eq, Copy, Clone)]
pub struct TagId(i32);

#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, Clone)]
#[diesel(table_name = crate::database::schema::tags)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub slug: String,
}

#[derive(DieselNewType, Display, Debug, Hash, PartialEq, Eq, Copy, Clone)]
pub struct RecipeId(i32);

#[derive(Associations, Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(belongs_to(User, foreign_key = author_id))]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct Recipe {
    pub id: RecipeId,
    pub author_id: UserId,
    pub name: String,
    pub image: String,
    pub description: String,
    pub cooking_time: i32,
    pub short_link_code: Option<String>,
    pub created_at: NaiveDateTime,
}

/// The compact projection used in listings and relation payloads.
#[derive(Queryable, Selectable, Identifiable, Clone)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct RecipeHandle {
    pub id: RecipeId,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

#[derive(DieselNewType, Display, Debug, Hash, PartialEq, Eq, Copy, Clone)]
pub struct RecipeIngredientId(i32);

#[derive(Associations, Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(belongs_to(Recipe))]
#[diesel(belongs_to(Ingredient))]
#[diesel(table_name = crate::database::schema::recipe_ingredients)]
pub struct RecipeIngredient {
    pub id: RecipeIngredientId,
    pub recipe_id: RecipeId,
    pub ingredient_id: IngredientId,
    pub amount: i32,
}

#[derive(Associations, Queryable, Selectable, Identifiable, Insertable, Clone)]
#[diesel(belongs_to(Recipe))]
#[diesel(belongs_to(Tag))]
#[diesel(primary_key(recipe_id, tag_id))]
#[diesel(table_name = crate::database::schema::recipe_tags)]
pub struct RecipeTag {
    pub recipe_id: RecipeId,
    pub tag_id: TagId,
}

#[derive(Associations, Queryable, Selectable, Identifiable, Insertable, Debug, Clone)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(Recipe))]
#[diesel(primary_key(user_id, recipe_id))]
#[diesel(table_name = crate::database::schema::favorites)]
pub struct Favorite {
    pub user_id: UserId,
    pub recipe_id: RecipeId,
}

#[derive(Associations, Queryable, Selectable, Identifiable, Insertable, Debug, Clone)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(Recipe))]
#[diesel(primary_key(user_id, recipe_id))]
#[diesel(table_name = crate::database::schema::shopping_cart_entries)]
pub struct ShoppingCartEntry {
    pub user_id: UserId,
    pub recipe_id: RecipeId,
}

#[derive(Queryable, Selectable, Identifiable, Insertable, Debug, Clone)]
#[diesel(primary_key(user_id, author_id))]
#[diesel(table_name = crate::database::schema::subscriptions)]
pub struct Subscription {
    pub user_id: UserId,
    pub author_id: UserId,
}
