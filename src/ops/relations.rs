use crate::database;
use crate::database::models::{
    Favorite, RecipeHandle, RecipeId, ShoppingCartEntry, Subscription, User, UserId,
};
use crate::error::{OpError, OpResult};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::BoolExpressionMethods as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;

fn user_exists(conn: &mut database::Connection, user: UserId) -> OpResult<bool> {
    use database::schema::users::dsl::*;

    let count: i64 = users.filter(id.eq(user)).count().get_result(conn)?;
    Ok(count > 0)
}

fn recipe_exists(conn: &mut database::Connection, recipe: RecipeId) -> OpResult<bool> {
    use database::schema::recipes::dsl::*;

    let count: i64 = recipes.filter(id.eq(recipe)).count().get_result(conn)?;
    Ok(count > 0)
}

pub fn subscribe(
    conn: &mut database::Connection,
    user: UserId,
    author: UserId,
) -> OpResult<Subscription> {
    use database::schema::subscriptions::dsl::*;
    use diesel::insert_into;

    if user == author {
        return Err(OpError::validation(
            "author",
            "subscribing to yourself is not allowed",
        ));
    }
    if !user_exists(conn, author)? {
        return Err(OpError::NotFound("author"));
    }

    let subscription = Subscription {
        user_id: user,
        author_id: author,
    };
    insert_into(subscriptions)
        .values(&subscription)
        .execute(conn)
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                OpError::Conflict("subscription")
            }
            other => other.into(),
        })?;
    Ok(subscription)
}

/// Returns false when there was nothing to remove.
pub fn unsubscribe(
    conn: &mut database::Connection,
    user: UserId,
    author: UserId,
) -> OpResult<bool> {
    use database::schema::subscriptions::dsl::*;
    use diesel::delete;

    let removed = delete(subscriptions.filter(user_id.eq(user).and(author_id.eq(author))))
        .execute(conn)?;
    Ok(removed > 0)
}

pub fn is_subscribed(
    conn: &mut database::Connection,
    viewer: Option<UserId>,
    author: UserId,
) -> OpResult<bool> {
    use database::schema::subscriptions::dsl::*;

    let Some(viewer) = viewer else {
        return Ok(false);
    };
    let count: i64 = subscriptions
        .filter(user_id.eq(viewer).and(author_id.eq(author)))
        .count()
        .get_result(conn)?;
    Ok(count > 0)
}

pub fn favorite(
    conn: &mut database::Connection,
    user: UserId,
    recipe: RecipeId,
) -> OpResult<Favorite> {
    use database::schema::favorites::dsl::*;
    use diesel::insert_into;

    if !recipe_exists(conn, recipe)? {
        return Err(OpError::NotFound("recipe"));
    }

    let entry = Favorite {
        user_id: user,
        recipe_id: recipe,
    };
    insert_into(favorites)
        .values(&entry)
        .execute(conn)
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                OpError::Conflict("favorite")
            }
            other => other.into(),
        })?;
    Ok(entry)
}

pub fn unfavorite(
    conn: &mut database::Connection,
    user: UserId,
    recipe: RecipeId,
) -> OpResult<bool> {
    use database::schema::favorites::dsl::*;
    use diesel::delete;

    let removed =
        delete(favorites.filter(user_id.eq(user).and(recipe_id.eq(recipe)))).execute(conn)?;
    Ok(removed > 0)
}

pub fn is_favorited(
    conn: &mut database::Connection,
    viewer: Option<UserId>,
    recipe: RecipeId,
) -> OpResult<bool> {
    use database::schema::favorites::dsl::*;

    let Some(viewer) = viewer else {
        return Ok(false);
    };
    let count: i64 = favorites
        .filter(user_id.eq(viewer).and(recipe_id.eq(recipe)))
        .count()
        .get_result(conn)?;
    Ok(count > 0)
}

pub fn add_to_cart(
    conn: &mut database::Connection,
    user: UserId,
    recipe: RecipeId,
) -> OpResult<ShoppingCartEntry> {
    use database::schema::shopping_cart_entries::dsl::*;
    use diesel::insert_into;

    if !recipe_exists(conn, recipe)? {
        return Err(OpError::NotFound("recipe"));
    }

    let entry = ShoppingCartEntry {
        user_id: user,
        recipe_id: recipe,
    };
    insert_into(shopping_cart_entries)
        .values(&entry)
        .execute(conn)
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                OpError::Conflict("shopping cart entry")
            }
            other => other.into(),
        })?;
    Ok(entry)
}

pub fn remove_from_cart(
    conn: &mut database::Connection,
    user: UserId,
    recipe: RecipeId,
) -> OpResult<bool> {
    use database::schema::shopping_cart_entries::dsl::*;
    use diesel::delete;

    let removed = delete(shopping_cart_entries.filter(user_id.eq(user).and(recipe_id.eq(recipe))))
        .execute(conn)?;
    Ok(removed > 0)
}

pub fn is_in_cart(
    conn: &mut database::Connection,
    viewer: Option<UserId>,
    recipe: RecipeId,
) -> OpResult<bool> {
    use database::schema::shopping_cart_entries::dsl::*;

    let Some(viewer) = viewer else {
        return Ok(false);
    };
    let count: i64 = shopping_cart_entries
        .filter(user_id.eq(viewer).and(recipe_id.eq(recipe)))
        .count()
        .get_result(conn)?;
    Ok(count > 0)
}

/// The authors the user subscribes to, each with their newest recipes.
/// `recipes_limit` caps the per-author recipe list.
pub fn list_subscriptions(
    conn: &mut database::Connection,
    user: UserId,
    recipes_limit: Option<i64>,
) -> OpResult<Vec<(User, Vec<RecipeHandle>)>> {
    let authors: Vec<User> = {
        use database::schema::subscriptions::dsl::*;
        use database::schema::users::dsl::{id, username, users};

        users
            .filter(id.eq_any(subscriptions.filter(user_id.eq(user)).select(author_id)))
            .order(username.asc())
            .select(User::as_select())
            .load(conn)?
    };

    authors
        .into_iter()
        .map(|author| {
            use database::schema::recipes::dsl::*;

            let mut query = recipes
                .filter(author_id.eq(author.id))
                .order((created_at.desc(), id.desc()))
                .select(RecipeHandle::as_select())
                .into_boxed();
            if let Some(limit) = recipes_limit {
                query = query.limit(limit);
            }
            Ok((author, query.load(conn)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testing;
    use assert_matches::assert_matches;

    #[test]
    fn self_subscription_is_rejected() {
        let mut conn = testing::connection();
        let ann = testing::user(&mut conn, "ann");

        assert_matches!(
            subscribe(&mut conn, ann.id, ann.id),
            Err(OpError::Validation {
                field: "author",
                ..
            })
        );
    }

    #[test]
    fn duplicate_subscription_conflicts() {
        let mut conn = testing::connection();
        let ann = testing::user(&mut conn, "ann");
        let bob = testing::user(&mut conn, "bob");

        subscribe(&mut conn, ann.id, bob.id).unwrap();
        assert_matches!(
            subscribe(&mut conn, ann.id, bob.id),
            Err(OpError::Conflict("subscription"))
        );
        // The reverse direction is a different relation.
        subscribe(&mut conn, bob.id, ann.id).unwrap();
    }

    #[test]
    fn unsubscribe_reports_missing_relation() {
        let mut conn = testing::connection();
        let ann = testing::user(&mut conn, "ann");
        let bob = testing::user(&mut conn, "bob");

        assert!(!unsubscribe(&mut conn, ann.id, bob.id).unwrap());
        subscribe(&mut conn, ann.id, bob.id).unwrap();
        assert!(unsubscribe(&mut conn, ann.id, bob.id).unwrap());
        assert!(!unsubscribe(&mut conn, ann.id, bob.id).unwrap());
    }

    #[test]
    fn subscribing_to_missing_author_is_not_found() {
        let mut conn = testing::connection();
        let ann = testing::user(&mut conn, "ann");

        assert_matches!(
            subscribe(&mut conn, ann.id, UserId::new(999)),
            Err(OpError::NotFound("author"))
        );
    }

    #[test]
    fn favorite_and_cart_round_trips() {
        let mut conn = testing::connection();
        let ann = testing::user(&mut conn, "ann");
        let bob = testing::user(&mut conn, "bob");
        let flour = testing::ingredient(&mut conn, "flour", "g");
        let tag = testing::tag(&mut conn, "dinner");
        let recipe = testing::recipe(&mut conn, bob.id, "Stew", &[(flour.id, 1)], &[tag.id]);

        favorite(&mut conn, ann.id, recipe.id).unwrap();
        assert_matches!(
            favorite(&mut conn, ann.id, recipe.id),
            Err(OpError::Conflict("favorite"))
        );
        assert!(is_favorited(&mut conn, Some(ann.id), recipe.id).unwrap());
        assert!(unfavorite(&mut conn, ann.id, recipe.id).unwrap());
        assert!(!unfavorite(&mut conn, ann.id, recipe.id).unwrap());

        add_to_cart(&mut conn, ann.id, recipe.id).unwrap();
        assert_matches!(
            add_to_cart(&mut conn, ann.id, recipe.id),
            Err(OpError::Conflict("shopping cart entry"))
        );
        assert!(is_in_cart(&mut conn, Some(ann.id), recipe.id).unwrap());
        assert!(remove_from_cart(&mut conn, ann.id, recipe.id).unwrap());
        assert!(!remove_from_cart(&mut conn, ann.id, recipe.id).unwrap());
    }

    #[test]
    fn relating_to_missing_recipe_is_not_found() {
        let mut conn = testing::connection();
        let ann = testing::user(&mut conn, "ann");
        let flour = testing::ingredient(&mut conn, "flour", "g");
        let tag = testing::tag(&mut conn, "dinner");
        let recipe = testing::recipe(&mut conn, ann.id, "Stew", &[(flour.id, 1)], &[tag.id]);
        crate::ops::recipe::delete_recipe(&mut conn, ann.id, recipe.id).unwrap();

        assert_matches!(
            favorite(&mut conn, ann.id, recipe.id),
            Err(OpError::NotFound("recipe"))
        );
        assert_matches!(
            add_to_cart(&mut conn, ann.id, recipe.id),
            Err(OpError::NotFound("recipe"))
        );
    }

    #[test]
    fn anonymous_viewers_are_related_to_nothing() {
        let mut conn = testing::connection();
        let bob = testing::user(&mut conn, "bob");
        let flour = testing::ingredient(&mut conn, "flour", "g");
        let tag = testing::tag(&mut conn, "dinner");
        let recipe = testing::recipe(&mut conn, bob.id, "Stew", &[(flour.id, 1)], &[tag.id]);

        assert!(!is_subscribed(&mut conn, None, bob.id).unwrap());
        assert!(!is_favorited(&mut conn, None, recipe.id).unwrap());
        assert!(!is_in_cart(&mut conn, None, recipe.id).unwrap());
    }

    #[test]
    fn subscriptions_list_authors_with_limited_recipes() {
        let mut conn = testing::connection();
        let ann = testing::user(&mut conn, "ann");
        let bob = testing::user(&mut conn, "bob");
        let carol = testing::user(&mut conn, "carol");
        let flour = testing::ingredient(&mut conn, "flour", "g");
        let tag = testing::tag(&mut conn, "dinner");

        for name in ["Stew", "Soup", "Salad"] {
            testing::recipe(&mut conn, bob.id, name, &[(flour.id, 1)], &[tag.id]);
        }
        testing::recipe(&mut conn, carol.id, "Toast", &[(flour.id, 1)], &[tag.id]);

        subscribe(&mut conn, ann.id, bob.id).unwrap();
        subscribe(&mut conn, ann.id, carol.id).unwrap();

        let listed = list_subscriptions(&mut conn, ann.id, Some(2)).unwrap();
        assert_eq!(listed.len(), 2);
        let (first_author, first_recipes) = &listed[0];
        assert_eq!(first_author.username, "bob");
        assert_eq!(first_recipes.len(), 2);
        let (second_author, second_recipes) = &listed[1];
        assert_eq!(second_author.username, "carol");
        assert_eq!(second_recipes.len(), 1);
    }
}
