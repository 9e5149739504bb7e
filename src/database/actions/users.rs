use std::collections::HashMap;

use crate::{
    authentication::{
        cryptography::{hash_password, password_matches},
        jwt::{generate_jwt_session, SessionKeys},
    },
    error::{ApiResult, HtmlError, QueryError},
    pagination::PageQuery,
    schema::{Id, User, UserRow},
    validation::{invalid_credentials, NewUser},
};

use sqlx::{Pool, Postgres};

use super::total_count;

/// Columns of `UserRow` for `users u`; `$1` binds the viewing user.
pub(super) const USER_ROW_COLUMNS: &str = "
    u.email, u.id, u.username, u.first_name, u.last_name,
    EXISTS (SELECT 1 FROM subscriptions s WHERE s.user_id = $1 AND s.author_id = u.id) AS is_subscribed";

pub async fn get_user(pool: &Pool<Postgres>, email: &str) -> ApiResult<Option<User>> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Id) -> ApiResult<Option<User>> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Public representation of `user_id` as seen by `viewer`.
pub async fn get_user_row(
    user_id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> ApiResult<UserRow> {
    let row: Option<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_ROW_COLUMNS} FROM users u WHERE u.id = $2"
    ))
    .bind(viewer)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    row.ok_or_else(|| HtmlError::NotFound.default())
}

pub async fn list_user_rows(
    user_ids: &[Id],
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> ApiResult<HashMap<Id, UserRow>> {
    let rows: Vec<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_ROW_COLUMNS} FROM users u WHERE u.id = ANY($2)"
    ))
    .bind(viewer)
    .bind(user_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| (row.id, row)).collect())
}

pub async fn fetch_users(
    viewer: Option<Id>,
    page: PageQuery,
    pool: &Pool<Postgres>,
) -> ApiResult<(Vec<UserRow>, i64)> {
    let rows: Vec<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_ROW_COLUMNS}, COUNT(*) OVER() AS count FROM users u ORDER BY u.id LIMIT $2 OFFSET $3"
    ))
    .bind(viewer)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total = total_count(&rows, |row| row.count);
    Ok((rows, total))
}

/// Creates a user; the password is stored as an argon2 hash.
pub async fn register_user(user: NewUser, pool: &Pool<Postgres>) -> ApiResult<User> {
    let password = hash_password(&user.password)?;

    let created: User = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
    ",
    )
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(password)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    log::info!("Registered user {} ({})", created.username, created.id);
    Ok(created)
}

pub async fn login_user(
    email: &str,
    password: &str,
    keys: &SessionKeys,
    pool: &Pool<Postgres>,
) -> ApiResult<String> {
    let user = get_user(pool, email)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !password_matches(password, &user.password) {
        return Err(invalid_credentials());
    }

    generate_jwt_session(&user, keys)
}

pub async fn set_password(
    user_id: Id,
    current_password: &str,
    new_password: &str,
    pool: &Pool<Postgres>,
) -> ApiResult<()> {
    let user = get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    if !password_matches(current_password, &user.password) {
        return Err(HtmlError::InvalidRequest.field("current_password", "Invalid password."));
    }

    let password = hash_password(new_password)?;

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}
