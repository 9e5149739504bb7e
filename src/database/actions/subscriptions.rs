use crate::{
    error::{ApiResult, HtmlError, QueryError},
    media::Media,
    pagination::PageQuery,
    schema::{Id, ShortRecipe, SubscriptionRow, SubscriptionView},
};

use sqlx::{Pool, Postgres};

use super::{
    recipes::list_author_recipes,
    total_count,
    users::{get_user_by_id, USER_ROW_COLUMNS},
};

/// Rejects following oneself before anything is looked up.
pub fn check_not_self(user_id: Id, author_id: Id) -> ApiResult<()> {
    if user_id == author_id {
        return Err(HtmlError::InvalidRequest.new("You cannot subscribe to yourself."));
    }
    Ok(())
}

async fn ensure_author_exists(author_id: Id, pool: &Pool<Postgres>) -> ApiResult<()> {
    match get_user_by_id(pool, author_id).await? {
        Some(_) => Ok(()),
        None => Err(HtmlError::NotFound.default()),
    }
}

pub async fn subscribe(
    user_id: Id,
    author_id: Id,
    recipes_limit: Option<usize>,
    media: &Media,
    pool: &Pool<Postgres>,
) -> ApiResult<SubscriptionView> {
    check_not_self(user_id, author_id)?;
    ensure_author_exists(author_id, pool).await?;

    let result = sqlx::query(
        "INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new("You are already subscribed to this author."));
    }

    let row: SubscriptionRow = sqlx::query_as(&format!(
        "
        SELECT {USER_ROW_COLUMNS},
            (SELECT COUNT(*) FROM recipes r WHERE r.author_id = u.id) AS recipes_count
        FROM users u WHERE u.id = $2
    "
    ))
    .bind(user_id)
    .bind(author_id)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    build_subscription_views(vec![row], recipes_limit, media, pool)
        .await?
        .pop()
        .ok_or_else(|| HtmlError::NotFound.default())
}

pub async fn unsubscribe(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> ApiResult<()> {
    check_not_self(user_id, author_id)?;
    ensure_author_exists(author_id, pool).await?;

    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new("You are not subscribed to this author."));
    }

    Ok(())
}

/// Authors followed by `user_id`, oldest subscription first.
pub async fn fetch_subscriptions(
    user_id: Id,
    page: PageQuery,
    recipes_limit: Option<usize>,
    media: &Media,
    pool: &Pool<Postgres>,
) -> ApiResult<(Vec<SubscriptionView>, i64)> {
    let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
        "
        SELECT {USER_ROW_COLUMNS},
            (SELECT COUNT(*) FROM recipes r WHERE r.author_id = u.id) AS recipes_count,
            COUNT(*) OVER() AS count
        FROM subscriptions sub
        INNER JOIN users u ON u.id = sub.author_id
        WHERE sub.user_id = $1
        ORDER BY sub.id
        LIMIT $2 OFFSET $3
    "
    ))
    .bind(user_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total = total_count(&rows, |row| row.author.count);
    let views = build_subscription_views(rows, recipes_limit, media, pool).await?;
    Ok((views, total))
}

async fn build_subscription_views(
    rows: Vec<SubscriptionRow>,
    recipes_limit: Option<usize>,
    media: &Media,
    pool: &Pool<Postgres>,
) -> ApiResult<Vec<SubscriptionView>> {
    let author_ids: Vec<Id> = rows.iter().map(|row| row.author.id).collect();
    let mut recipes = list_author_recipes(&author_ids, pool).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let recipes = recipes
                .remove(&row.author.id)
                .unwrap_or_default()
                .iter()
                .take(recipes_limit.unwrap_or(usize::MAX))
                .map(|recipe| ShortRecipe::from_recipe(recipe, media))
                .collect();

            SubscriptionView {
                author: row.author,
                recipes,
                recipes_count: row.recipes_count,
            }
        })
        .collect())
}
