use crate::database;
use crate::database::models::{Ingredient, IngredientId, Tag, TagId};
use crate::error::{OpError, OpResult};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;

fn is_valid_slug(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

pub fn add_ingredient(
    conn: &mut database::Connection,
    new_name: &str,
    unit: &str,
) -> OpResult<Ingredient> {
    use database::schema::ingredients::dsl::*;
    use diesel::insert_into;

    if new_name.trim().is_empty() {
        return Err(OpError::validation("name", "must not be empty"));
    }
    if unit.trim().is_empty() {
        return Err(OpError::validation("measurement_unit", "must not be empty"));
    }

    insert_into(ingredients)
        .values((name.eq(new_name), measurement_unit.eq(unit)))
        .returning(Ingredient::as_returning())
        .get_result(conn)
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                OpError::Conflict("ingredient")
            }
            other => other.into(),
        })
}

pub fn get_ingredient(
    conn: &mut database::Connection,
    ingredient_id: IngredientId,
) -> OpResult<Ingredient> {
    use database::schema::ingredients::dsl::*;

    ingredients
        .find(ingredient_id)
        .select(Ingredient::as_select())
        .get_result(conn)
        .map_err(|e| match e {
            DieselError::NotFound => OpError::NotFound("ingredient"),
            other => other.into(),
        })
}

pub fn list_ingredients(conn: &mut database::Connection) -> OpResult<Vec<Ingredient>> {
    use database::schema::ingredients::dsl::*;

    Ok(ingredients
        .select(Ingredient::as_select())
        .order(name.asc())
        .load(conn)?)
}

pub fn search_ingredients(
    conn: &mut database::Connection,
    query: &str,
) -> OpResult<Vec<Ingredient>> {
    use database::schema::ingredients::dsl::*;
    use diesel::expression_methods::TextExpressionMethods as _;

    Ok(ingredients
        .select(Ingredient::as_select())
        .filter(name.like(format!("%{query}%")))
        .order(name.asc())
        .load(conn)?)
}

pub fn add_tag(conn: &mut database::Connection, new_name: &str, new_slug: &str) -> OpResult<Tag> {
    use database::schema::tags::dsl::*;
    use diesel::insert_into;

    if new_name.trim().is_empty() {
        return Err(OpError::validation("name", "must not be empty"));
    }
    if !is_valid_slug(new_slug) {
        return Err(OpError::validation(
            "slug",
            "must consist of lowercase letters, digits, hyphens and underscores",
        ));
    }

    insert_into(tags)
        .values((name.eq(new_name), slug.eq(new_slug)))
        .returning(Tag::as_returning())
        .get_result(conn)
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                OpError::Conflict("tag")
            }
            other => other.into(),
        })
}

pub fn get_tag(conn: &mut database::Connection, tag_id: TagId) -> OpResult<Tag> {
    use database::schema::tags::dsl::*;

    tags.find(tag_id)
        .select(Tag::as_select())
        .get_result(conn)
        .map_err(|e| match e {
            DieselError::NotFound => OpError::NotFound("tag"),
            other => other.into(),
        })
}

pub fn get_tag_by_slug(conn: &mut database::Connection, tag_slug: &str) -> OpResult<Tag> {
    use database::schema::tags::dsl::*;

    tags.filter(slug.eq(tag_slug))
        .select(Tag::as_select())
        .get_result(conn)
        .map_err(|e| match e {
            DieselError::NotFound => OpError::NotFound("tag"),
            other => other.into(),
        })
}

pub fn list_tags(conn: &mut database::Connection) -> OpResult<Vec<Tag>> {
    use database::schema::tags::dsl::*;

    Ok(tags.select(Tag::as_select()).order(name.asc()).load(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testing;
    use assert_matches::assert_matches;

    #[test]
    fn ingredient_name_unit_pair_is_unique() {
        let mut conn = testing::connection();

        add_ingredient(&mut conn, "flour", "g").unwrap();
        assert_matches!(
            add_ingredient(&mut conn, "flour", "g"),
            Err(OpError::Conflict("ingredient"))
        );

        // Same name under a different unit is a different catalog entry.
        add_ingredient(&mut conn, "flour", "cup").unwrap();
    }

    #[test]
    fn ingredient_search_matches_substring() {
        let mut conn = testing::connection();

        add_ingredient(&mut conn, "brown sugar", "g").unwrap();
        add_ingredient(&mut conn, "sugar", "g").unwrap();
        add_ingredient(&mut conn, "salt", "g").unwrap();

        let found = search_ingredients(&mut conn, "sugar").unwrap();
        let names: Vec<_> = found.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["brown sugar", "sugar"]);
    }

    #[test]
    fn tag_slug_is_validated_and_unique() {
        let mut conn = testing::connection();

        assert_matches!(
            add_tag(&mut conn, "Breakfast", "Breakfast!"),
            Err(OpError::Validation { field: "slug", .. })
        );

        add_tag(&mut conn, "Breakfast", "breakfast").unwrap();
        assert_matches!(
            add_tag(&mut conn, "Second Breakfast", "breakfast"),
            Err(OpError::Conflict("tag"))
        );
    }

    #[test]
    fn tag_lookup_by_slug() {
        let mut conn = testing::connection();

        let tag = add_tag(&mut conn, "Dinner", "dinner").unwrap();
        assert_eq!(get_tag_by_slug(&mut conn, "dinner").unwrap().id, tag.id);
        assert_matches!(
            get_tag_by_slug(&mut conn, "supper"),
            Err(OpError::NotFound("tag"))
        );
    }

    #[test]
    fn empty_catalog_fields_are_rejected() {
        let mut conn = testing::connection();

        assert_matches!(
            add_ingredient(&mut conn, "", "g"),
            Err(OpError::Validation { field: "name", .. })
        );
        assert_matches!(
            add_ingredient(&mut conn, "flour", " "),
            Err(OpError::Validation {
                field: "measurement_unit",
                ..
            })
        );
    }
}
