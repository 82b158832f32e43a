use crate::database;
use crate::database::models::{User, UserId};
use crate::error::{OpError, OpResult};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;

pub fn register_user(
    conn: &mut database::Connection,
    new_email: &str,
    new_username: &str,
    new_first_name: &str,
    new_last_name: &str,
) -> OpResult<User> {
    use database::schema::users::dsl::*;
    use diesel::insert_into;

    if new_email.trim().is_empty() || !new_email.contains('@') {
        return Err(OpError::validation("email", "must be an email address"));
    }
    if new_username.trim().is_empty() {
        return Err(OpError::validation("username", "must not be empty"));
    }

    insert_into(users)
        .values((
            email.eq(new_email),
            username.eq(new_username),
            first_name.eq(new_first_name),
            last_name.eq(new_last_name),
        ))
        .returning(User::as_returning())
        .get_result(conn)
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                OpError::Conflict("user")
            }
            other => other.into(),
        })
}

pub fn get_user(conn: &mut database::Connection, user_id: UserId) -> OpResult<User> {
    use database::schema::users::dsl::*;

    users
        .find(user_id)
        .select(User::as_select())
        .get_result(conn)
        .map_err(|e| match e {
            DieselError::NotFound => OpError::NotFound("user"),
            other => other.into(),
        })
}

pub fn update_avatar(
    conn: &mut database::Connection,
    user_id: UserId,
    new_avatar: &str,
) -> OpResult<()> {
    use database::schema::users::dsl::*;
    use diesel::update;

    if new_avatar.trim().is_empty() {
        return Err(OpError::validation("avatar", "must not be empty"));
    }

    let updated = update(users.find(user_id))
        .set(avatar.eq(new_avatar))
        .execute(conn)?;
    if updated == 0 {
        return Err(OpError::NotFound("user"));
    }
    Ok(())
}

pub fn clear_avatar(conn: &mut database::Connection, user_id: UserId) -> OpResult<()> {
    use database::schema::users::dsl::*;
    use diesel::update;

    let updated = update(users.find(user_id))
        .set(avatar.eq(None::<String>))
        .execute(conn)?;
    if updated == 0 {
        return Err(OpError::NotFound("user"));
    }
    Ok(())
}
