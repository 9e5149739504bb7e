use std::collections::HashMap;

use crate::{
    error::{ApiResult, HtmlError, QueryError},
    jwt::SessionData,
    media::Media,
    pagination::PageQuery,
    permissions::can_modify_recipe,
    schema::{Id, Recipe, RecipeFilter, RecipeRow, RecipeView, Tag},
    validation::{IngredientAmount, RecipeDraft},
};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use super::{
    ingredients::{ensure_ingredients_exist, list_recipe_ingredients},
    tags::{ensure_tags_exist, list_recipe_tags},
    total_count,
    users::list_user_rows,
};

/// `SELECT` of `RecipeRow` with membership flags resolved for `viewer`.
fn recipe_select(viewer: Option<Id>) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(
        "SELECT r.id, r.author_id, r.name, r.text, r.image, r.cooking_time, \
         EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ",
    );
    builder.push_bind(viewer);
    builder.push(
        ") AS is_favorited, \
         EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ",
    );
    builder.push_bind(viewer);
    builder.push(") AS is_in_shopping_cart");
    builder
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    viewer: Option<Id>,
    page: PageQuery,
    media: &Media,
    pool: &Pool<Postgres>,
) -> ApiResult<(Vec<RecipeView>, i64)> {
    // Membership filters only make sense for a known user.
    if viewer.is_none() && (filter.is_favorited || filter.is_in_shopping_cart) {
        return Ok((vec![], 0));
    }

    let mut builder = recipe_select(viewer);
    builder.push(", COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

    if let Some(author) = filter.author {
        builder.push(" AND r.author_id = ");
        builder.push_bind(author);
    }
    if !filter.tags.is_empty() {
        builder.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
             WHERE rt.recipe_id = r.id AND t.slug = ANY(",
        );
        builder.push_bind(filter.tags.clone());
        builder.push("))");
    }
    if filter.is_favorited {
        builder.push(
            " AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ",
        );
        builder.push_bind(viewer);
        builder.push(")");
    }
    if filter.is_in_shopping_cart {
        builder.push(
            " AND EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ",
        );
        builder.push_bind(viewer);
        builder.push(")");
    }

    builder.push(" ORDER BY r.id DESC LIMIT ");
    builder.push_bind(page.limit);
    builder.push(" OFFSET ");
    builder.push_bind(page.offset());

    let rows: Vec<RecipeRow> = builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total = total_count(&rows, |row| row.count);
    let views = build_recipe_views(rows, viewer, media, pool).await?;
    Ok((views, total))
}

/// Attaches authors, tags and ingredients to recipe rows, three queries for the whole batch.
async fn build_recipe_views(
    rows: Vec<RecipeRow>,
    viewer: Option<Id>,
    media: &Media,
    pool: &Pool<Postgres>,
) -> ApiResult<Vec<RecipeView>> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let recipe_ids: Vec<Id> = rows.iter().map(|row| row.id).collect();
    let author_ids: Vec<Id> = rows.iter().map(|row| row.author_id).collect();

    let authors = list_user_rows(&author_ids, viewer, pool).await?;

    let mut tags: HashMap<Id, Vec<Tag>> = HashMap::new();
    for row in list_recipe_tags(&recipe_ids, pool).await? {
        tags.entry(row.recipe_id).or_default().push(row.into());
    }

    let mut ingredients: HashMap<Id, Vec<_>> = HashMap::new();
    for row in list_recipe_ingredients(&recipe_ids, pool).await? {
        ingredients.entry(row.recipe_id).or_default().push(row);
    }

    rows.into_iter()
        .map(|row| -> ApiResult<RecipeView> {
            // Authors repeat across a page, so clone instead of removing.
            let author = authors.get(&row.author_id).cloned().ok_or_else(|| {
                log::error!("Recipe {} references missing author {}", row.id, row.author_id);
                HtmlError::InternalServerError.default()
            })?;

            Ok(RecipeView {
                id: row.id,
                author,
                name: row.name,
                text: row.text,
                image: media.url(&row.image),
                cooking_time: row.cooking_time,
                tags: tags.remove(&row.id).unwrap_or_default(),
                ingredients: ingredients.remove(&row.id).unwrap_or_default(),
                is_favorited: row.is_favorited,
                is_in_shopping_cart: row.is_in_shopping_cart,
            })
        })
        .collect()
}

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> ApiResult<Option<Recipe>> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Loads a recipe the session may modify: missing is 404, someone else's is 403.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> ApiResult<Recipe> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    if !can_modify_recipe(session, recipe.author_id) {
        return Err(HtmlError::Forbidden.default());
    }
    Ok(recipe)
}

pub async fn get_recipe_view(
    id: Id,
    viewer: Option<Id>,
    media: &Media,
    pool: &Pool<Postgres>,
) -> ApiResult<RecipeView> {
    let mut builder = recipe_select(viewer);
    builder.push(" FROM recipes r WHERE r.id = ");
    builder.push_bind(id);

    let row: Option<RecipeRow> = builder
        .build_query_as()
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;
    let row = row.ok_or_else(|| HtmlError::NotFound.default())?;

    build_recipe_views(vec![row], viewer, media, pool)
        .await?
        .pop()
        .ok_or_else(|| HtmlError::NotFound.default())
}

async fn ensure_references_exist(draft: &RecipeDraft, pool: &Pool<Postgres>) -> ApiResult<()> {
    let ingredient_ids: Vec<Id> = draft.ingredients.iter().map(|i| i.id).collect();
    ensure_ingredients_exist(&ingredient_ids, pool).await?;
    ensure_tags_exist(&draft.tags, pool).await
}

async fn insert_recipe_links(
    recipe_id: Id,
    tags: &[Id],
    ingredients: &[IngredientAmount],
    conn: &mut PgConnection,
) -> ApiResult<()> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    builder.push_values(tags, |mut row, tag| {
        row.push_bind(recipe_id).push_bind(*tag);
    });
    builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    builder.push_values(ingredients, |mut row, ingredient| {
        row.push_bind(recipe_id)
            .push_bind(ingredient.id)
            .push_bind(ingredient.amount);
    });
    builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

async fn insert_recipe(
    author_id: Id,
    draft: &RecipeDraft,
    image: &str,
    pool: &Pool<Postgres>,
) -> ApiResult<Id> {
    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    let (id,): (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&draft.name)
    .bind(&draft.text)
    .bind(image)
    .bind(draft.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    insert_recipe_links(id, &draft.tags, &draft.ingredients, &mut *tr).await?;

    tr.commit().await.map_err(QueryError::from)?;
    Ok(id)
}

/// Stores the image, then the recipe with its tags and ingredients in one transaction.
/// The image is removed again when the transaction fails.
pub async fn create_recipe(
    author_id: Id,
    draft: RecipeDraft,
    media: &Media,
    pool: &Pool<Postgres>,
) -> ApiResult<Id> {
    ensure_references_exist(&draft, pool).await?;

    let image = draft
        .image
        .as_ref()
        .ok_or_else(|| HtmlError::InvalidRequest.field("image", "This field is required."))?;
    let path = media.save_image(image).await?;

    match insert_recipe(author_id, &draft, &path, pool).await {
        Ok(id) => {
            log::info!("User {author_id} created recipe {id}");
            Ok(id)
        }
        Err(e) => {
            media.remove(&path).await;
            Err(e)
        }
    }
}

async fn replace_recipe(
    recipe_id: Id,
    draft: &RecipeDraft,
    image: &str,
    pool: &Pool<Postgres>,
) -> ApiResult<()> {
    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    sqlx::query(
        "UPDATE recipes SET name = $1, text = $2, image = $3, cooking_time = $4 WHERE id = $5",
    )
    .bind(&draft.name)
    .bind(&draft.text)
    .bind(image)
    .bind(draft.cooking_time)
    .bind(recipe_id)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    insert_recipe_links(recipe_id, &draft.tags, &draft.ingredients, &mut *tr).await?;

    tr.commit().await.map_err(QueryError::from)?;
    Ok(())
}

/// Replaces the recipe fields and its tag and ingredient sets.
/// The stored image is kept unless the draft carries a new one.
pub async fn update_recipe(
    recipe: &Recipe,
    draft: RecipeDraft,
    media: &Media,
    pool: &Pool<Postgres>,
) -> ApiResult<()> {
    ensure_references_exist(&draft, pool).await?;

    let new_image = match &draft.image {
        Some(image) => Some(media.save_image(image).await?),
        None => None,
    };
    let image = new_image.as_deref().unwrap_or(recipe.image.as_str());

    match replace_recipe(recipe.id, &draft, image, pool).await {
        Ok(()) => {
            if new_image.is_some() {
                media.remove(&recipe.image).await;
            }
            Ok(())
        }
        Err(e) => {
            if let Some(path) = &new_image {
                media.remove(path).await;
            }
            Err(e)
        }
    }
}

/// Deleting cascades to tag, ingredient, favorite and cart rows.
pub async fn delete_recipe(
    recipe: &Recipe,
    media: &Media,
    pool: &Pool<Postgres>,
) -> ApiResult<()> {
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    media.remove(&recipe.image).await;
    log::info!("Deleted recipe {}", recipe.id);
    Ok(())
}

/// Recipes of each author, newest first.
pub async fn list_author_recipes(
    author_ids: &[Id],
    pool: &Pool<Postgres>,
) -> ApiResult<HashMap<Id, Vec<Recipe>>> {
    let rows: Vec<Recipe> =
        sqlx::query_as("SELECT * FROM recipes WHERE author_id = ANY($1) ORDER BY id DESC")
            .bind(author_ids)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;

    let mut recipes: HashMap<Id, Vec<Recipe>> = HashMap::new();
    for row in rows {
        recipes.entry(row.author_id).or_default().push(row);
    }
    Ok(recipes)
}
