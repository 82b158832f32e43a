use crate::database;
use crate::database::models::{Ingredient, RecipeIngredient, UserId};
use crate::error::OpResult;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use std::collections::BTreeMap;
use std::fmt;

/// One deduplicated line of the exported shopping list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListEntry {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

impl fmt::Display for ShoppingListEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} {})",
            self.name, self.total_amount, self.measurement_unit
        )
    }
}

/// Collects the ingredient lines of every recipe in the user's cart,
/// summed per (name, unit) and ordered by ingredient name. Read-only.
pub fn build_shopping_list(
    conn: &mut database::Connection,
    user: UserId,
) -> OpResult<Vec<ShoppingListEntry>> {
    let rows: Vec<(RecipeIngredient, Ingredient)> = {
        use database::schema::recipe_ingredients::dsl::*;

        let cart_recipes = {
            use database::schema::shopping_cart_entries::dsl::*;
            shopping_cart_entries
                .filter(user_id.eq(user))
                .select(recipe_id)
        };
        recipe_ingredients
            .inner_join(database::schema::ingredients::table)
            .filter(recipe_id.eq_any(cart_recipes))
            .select((RecipeIngredient::as_select(), Ingredient::as_select()))
            .load(conn)?
    };

    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for (line, ingredient) in rows {
        *totals
            .entry((ingredient.name, ingredient.measurement_unit))
            .or_default() += i64::from(line.amount);
    }

    Ok(totals
        .into_iter()
        .map(|((name, measurement_unit), total_amount)| ShoppingListEntry {
            name,
            measurement_unit,
            total_amount,
        })
        .collect())
}

/// The plain-text document handed to the external renderer.
pub fn render_shopping_list(entries: &[ShoppingListEntry]) -> String {
    let mut document = String::from("Shopping List\n\n");
    for entry in entries {
        document += &format!("- {entry}\n");
    }
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::relations;
    use crate::ops::testing;

    #[test]
    fn shared_ingredients_are_summed() {
        let mut conn = testing::connection();
        let ann = testing::user(&mut conn, "ann");
        let bob = testing::user(&mut conn, "bob");
        let flour = testing::ingredient(&mut conn, "flour", "g");
        let butter = testing::ingredient(&mut conn, "butter", "g");
        let tag = testing::tag(&mut conn, "baking");

        let bread = testing::recipe(&mut conn, bob.id, "Bread", &[(flour.id, 200)], &[tag.id]);
        let cake = testing::recipe(
            &mut conn,
            bob.id,
            "Cake",
            &[(flour.id, 300), (butter.id, 50)],
            &[tag.id],
        );
        relations::add_to_cart(&mut conn, ann.id, bread.id).unwrap();
        relations::add_to_cart(&mut conn, ann.id, cake.id).unwrap();

        let list = build_shopping_list(&mut conn, ann.id).unwrap();
        assert_eq!(
            list,
            vec![
                ShoppingListEntry {
                    name: "butter".into(),
                    measurement_unit: "g".into(),
                    total_amount: 50,
                },
                ShoppingListEntry {
                    name: "flour".into(),
                    measurement_unit: "g".into(),
                    total_amount: 500,
                },
            ]
        );
    }

    #[test]
    fn same_name_different_unit_stays_separate() {
        let mut conn = testing::connection();
        let ann = testing::user(&mut conn, "ann");
        let grams = testing::ingredient(&mut conn, "flour", "g");
        let cups = testing::ingredient(&mut conn, "flour", "cup");
        let tag = testing::tag(&mut conn, "baking");

        let recipe = testing::recipe(
            &mut conn,
            ann.id,
            "Odd Bread",
            &[(grams.id, 100), (cups.id, 2)],
            &[tag.id],
        );
        relations::add_to_cart(&mut conn, ann.id, recipe.id).unwrap();

        let list = build_shopping_list(&mut conn, ann.id).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].measurement_unit, "cup");
        assert_eq!(list[1].measurement_unit, "g");
    }

    #[test]
    fn empty_cart_renders_empty_list() {
        let mut conn = testing::connection();
        let ann = testing::user(&mut conn, "ann");

        let list = build_shopping_list(&mut conn, ann.id).unwrap();
        assert!(list.is_empty());
        assert_eq!(render_shopping_list(&list), "Shopping List\n\n");
    }

    #[test]
    fn rendering_lists_one_entry_per_line() {
        let entries = vec![
            ShoppingListEntry {
                name: "flour".into(),
                measurement_unit: "g".into(),
                total_amount: 500,
            },
            ShoppingListEntry {
                name: "milk".into(),
                measurement_unit: "ml".into(),
                total_amount: 250,
            },
        ];
        assert_eq!(
            render_shopping_list(&entries),
            "Shopping List\n\n- flour (500 g)\n- milk (250 ml)\n"
        );
    }
}
