use crate::database;
use crate::database::models::RecipeId;
use crate::error::{OpError, OpResult};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use rand::Rng;

pub const CODE_LENGTH: usize = 8;

const CODE_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

fn generate_code(rng: &mut impl Rng) -> String {
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Codes are handed out lazily: a recipe gets one the first time somebody
/// asks for its short link, and keeps it from then on.
pub fn get_or_assign_code(conn: &mut database::Connection, recipe: RecipeId) -> OpResult<String> {
    use database::schema::recipes::dsl::*;
    use diesel::update;

    let existing: Option<String> = recipes
        .find(recipe)
        .select(short_link_code)
        .get_result(conn)
        .map_err(|e| match e {
            DieselError::NotFound => OpError::NotFound("recipe"),
            other => other.into(),
        })?;
    if let Some(code) = existing {
        return Ok(code);
    }

    let mut rng = rand::rng();
    loop {
        let code = generate_code(&mut rng);
        let assigned = update(recipes.find(recipe).filter(short_link_code.is_null()))
            .set(short_link_code.eq(&code))
            .execute(conn);
        match assigned {
            Ok(1) => {
                log::debug!("assigned short link {code} to recipe {recipe}");
                return Ok(code);
            }
            Ok(_) => {
                // A concurrent caller won the assignment; use the stored code.
                let stored: Option<String> = recipes
                    .find(recipe)
                    .select(short_link_code)
                    .get_result(conn)
                    .map_err(|e| match e {
                        DieselError::NotFound => OpError::NotFound("recipe"),
                        other => other.into(),
                    })?;
                match stored {
                    Some(code) => return Ok(code),
                    None => return Err(OpError::NotFound("recipe")),
                }
            }
            // Collision with another recipe's code; generate a fresh one.
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => continue,
            Err(other) => return Err(other.into()),
        }
    }
}

pub fn resolve(conn: &mut database::Connection, code: &str) -> OpResult<RecipeId> {
    use database::schema::recipes::dsl::*;

    recipes
        .filter(short_link_code.eq(code))
        .select(id)
        .get_result(conn)
        .map_err(|e| match e {
            DieselError::NotFound => OpError::NotFound("short link"),
            other => other.into(),
        })
}
