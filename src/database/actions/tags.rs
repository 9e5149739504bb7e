use crate::{
    error::{ApiResult, HtmlError, QueryError},
    schema::{Id, RecipeTagRow, Tag},
};

use sqlx::{Pool, Postgres};

/// Inserts the tag unless any of its unique fields is taken. Returns whether a row was added.
pub async fn create_tag(
    name: &str,
    color: &str,
    slug: &str,
    pool: &Pool<Postgres>,
) -> ApiResult<bool> {
    let result = sqlx::query(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
    )
    .bind(name)
    .bind(color)
    .bind(slug)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> ApiResult<Option<Tag>> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Postgres>) -> ApiResult<Vec<Tag>> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

/// Fails on the first id in `ids` that has no tag.
pub async fn ensure_tags_exist(ids: &[Id], pool: &Pool<Postgres>) -> ApiResult<()> {
    let found: Vec<(Id,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    match ids.iter().find(|id| !found.iter().any(|(found,)| found == *id)) {
        Some(missing) => Err(HtmlError::InvalidRequest.field(
            "tags",
            &format!("Invalid pk \"{missing}\" - object does not exist."),
        )),
        None => Ok(()),
    }
}

pub async fn list_recipe_tags(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> ApiResult<Vec<RecipeTagRow>> {
    let list: Vec<RecipeTagRow> = sqlx::query_as(
        "
        SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}
