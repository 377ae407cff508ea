use crate::{
    error::{Error, QueryError},
    schema::{NewUser, User, UserChanges, Uuid},
};

use sqlx::{Pool, Postgres};

pub async fn get_user(pool: &Pool<Postgres>, email: &str) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(&*pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Uuid) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&*pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Creates a user; `user.password` is already hashed. Returns `None` if the
/// email is taken.
pub async fn register_user(user: NewUser, pool: &Pool<Postgres>) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (email, name, password, is_staff)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT DO NOTHING RETURNING *;
    ",
    )
    .bind(user.email)
    .bind(user.name)
    .bind(user.password)
    .bind(user.is_staff)
    .fetch_optional(&*pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn update_user(
    user_id: Uuid,
    changes: UserChanges,
    pool: &Pool<Postgres>,
) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as(
        "
        UPDATE users SET
        email = COALESCE($2, email),
        name = COALESCE($3, name),
        password = COALESCE($4, password)
        WHERE id = $1
        RETURNING *
    ",
    )
    .bind(user_id)
    .bind(changes.email)
    .bind(changes.name)
    .bind(changes.password)
    .fetch_optional(&*pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}
