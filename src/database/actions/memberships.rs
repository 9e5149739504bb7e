use crate::{
    authentication::permissions::ActionType,
    error::{ApiResult, HtmlError, QueryError},
    schema::{Id, Recipe, ShoppingListRow},
    shopping_list::ShoppingList,
};

use sqlx::{Pool, Postgres};

use super::recipes::get_recipe;

/// Per-user recipe collections that behave as toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeMembership {
    Favorite,
    ShoppingCart,
}

impl RecipeMembership {
    fn table(self) -> &'static str {
        match self {
            RecipeMembership::Favorite => "favorites",
            RecipeMembership::ShoppingCart => "shopping_cart",
        }
    }

    pub fn action(self) -> ActionType {
        match self {
            RecipeMembership::Favorite => ActionType::ManageOwnFavorites,
            RecipeMembership::ShoppingCart => ActionType::ManageOwnShoppingCart,
        }
    }

    fn already_added(self) -> &'static str {
        match self {
            RecipeMembership::Favorite => "Recipe is already in favorites.",
            RecipeMembership::ShoppingCart => "Recipe is already in the shopping cart.",
        }
    }

    fn not_added(self) -> &'static str {
        match self {
            RecipeMembership::Favorite => "Recipe is not in favorites.",
            RecipeMembership::ShoppingCart => "Recipe is not in the shopping cart.",
        }
    }
}

/// Adds the recipe and returns it; a second add for the same pair is a conflict.
pub async fn add_recipe_membership(
    kind: RecipeMembership,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> ApiResult<Recipe> {
    let recipe = get_recipe(recipe_id, pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new(kind.already_added()));
    }

    Ok(recipe)
}

pub async fn remove_recipe_membership(
    kind: RecipeMembership,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> ApiResult<()> {
    if get_recipe(recipe_id, pool).await?.is_none() {
        return Err(HtmlError::NotFound.default());
    }

    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new(kind.not_added()));
    }

    Ok(())
}

pub async fn fetch_shopping_list(user_id: Id, pool: &Pool<Postgres>) -> ApiResult<ShoppingList> {
    let rows: Vec<ShoppingListRow> = sqlx::query_as(
        "
        SELECT i.name, i.measurement_unit, ri.amount
        FROM shopping_cart c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(ShoppingList::from_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memberships_use_their_own_tables_and_permissions() {
        assert_eq!(RecipeMembership::Favorite.table(), "favorites");
        assert_eq!(RecipeMembership::ShoppingCart.table(), "shopping_cart");
        assert_eq!(
            RecipeMembership::ShoppingCart.action(),
            ActionType::ManageOwnShoppingCart
        );
    }
}
