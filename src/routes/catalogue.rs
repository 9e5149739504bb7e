use warp::{filters::BoxedFilter, http::StatusCode, reply::Response, Filter};

use super::{finish, json_reply, query_form, with_state, AppState};
use crate::{
    actions::{get_ingredient, get_tag, list_ingredients, list_tags},
    error::{ApiResult, HtmlError},
    form::Form,
    middleware::reject_invalid_session,
    schema::Id,
};

async fn tags(state: AppState) -> ApiResult<Response> {
    let tags = list_tags(&state.pool).await?;
    Ok(json_reply(&tags, StatusCode::OK))
}

async fn tag(id: Id, state: AppState) -> ApiResult<Response> {
    let tag = get_tag(id, &state.pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;
    Ok(json_reply(&tag, StatusCode::OK))
}

async fn ingredients(state: AppState, form: Form) -> ApiResult<Response> {
    let ingredients = list_ingredients(form.get_str("name"), &state.pool).await?;
    Ok(json_reply(&ingredients, StatusCode::OK))
}

async fn ingredient(id: Id, state: AppState) -> ApiResult<Response> {
    let ingredient = get_ingredient(id, &state.pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;
    Ok(json_reply(&ingredient, StatusCode::OK))
}

/// Read-only `/api/tags/` and `/api/ingredients/`; public, unpaginated.
pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let keys = state.keys.clone();

    let tag_list = warp::path!("api" / "tags")
        .and(warp::get())
        .and(reject_invalid_session(keys.clone()))
        .and(with_state(state.clone()))
        .then(tags)
        .map(finish);

    let tag_detail = warp::path!("api" / "tags" / Id)
        .and(warp::get())
        .and(reject_invalid_session(keys.clone()))
        .and(with_state(state.clone()))
        .then(tag)
        .map(finish);

    let ingredient_list = warp::path!("api" / "ingredients")
        .and(warp::get())
        .and(reject_invalid_session(keys.clone()))
        .and(with_state(state.clone()))
        .and(query_form())
        .then(ingredients)
        .map(finish);

    let ingredient_detail = warp::path!("api" / "ingredients" / Id)
        .and(warp::get())
        .and(reject_invalid_session(keys))
        .and(with_state(state))
        .then(ingredient)
        .map(finish);

    tag_list
        .or(tag_detail)
        .unify()
        .or(ingredient_list)
        .unify()
        .or(ingredient_detail)
        .unify()
        .boxed()
}
