use crate::{
    error::{ApiResult, HtmlError, QueryError},
    schema::{Id, Ingredient, RecipeIngredientRow},
};

use sqlx::{Pool, Postgres};

/// Lowercased `LIKE` prefix pattern with wildcards in the input escaped.
fn prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Lists ingredients ordered by name, optionally restricted to a case-insensitive name prefix.
pub async fn list_ingredients(
    name: Option<&str>,
    pool: &Pool<Postgres>,
) -> ApiResult<Vec<Ingredient>> {
    let list: Vec<Ingredient> = match name.filter(|name| !name.trim().is_empty()) {
        Some(name) => {
            sqlx::query_as("SELECT * FROM ingredients WHERE LOWER(name) LIKE $1 ORDER BY name, id")
                .bind(prefix_pattern(name))
                .fetch_all(pool)
                .await
        }
        None => {
            sqlx::query_as("SELECT * FROM ingredients ORDER BY name, id")
                .fetch_all(pool)
                .await
        }
    }
    .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> ApiResult<Option<Ingredient>> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Fails with not found on the first id in `ids` that has no ingredient.
pub async fn ensure_ingredients_exist(ids: &[Id], pool: &Pool<Postgres>) -> ApiResult<()> {
    let found: Vec<(Id,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    match ids.iter().find(|id| !found.iter().any(|(found,)| found == *id)) {
        Some(missing) => Err(HtmlError::NotFound.new(&format!(
            "Ingredient {missing} does not exist."
        ))),
        None => Ok(()),
    }
}

pub async fn create_ingredient(
    name: &str,
    measurement_unit: &str,
    pool: &Pool<Postgres>,
) -> ApiResult<bool> {
    let result = sqlx::query(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(name)
    .bind(measurement_unit)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_recipe_ingredients(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> ApiResult<Vec<RecipeIngredientRow>> {
    let rows: Vec<RecipeIngredientRow> = sqlx::query_as(
        "
        SELECT ri.recipe_id, i.id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::prefix_pattern;

    #[test]
    fn prefix_is_lowercased_and_escaped() {
        assert_eq!(prefix_pattern(" Sug"), "sug%");
        assert_eq!(prefix_pattern("50%_off"), "50\\%\\_off%");
        assert_eq!(prefix_pattern(""), "%");
    }
}
