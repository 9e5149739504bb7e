use warp::{filters::BoxedFilter, http::StatusCode, reply::Response, Filter, Reply};

use super::{
    finish, json_body, json_reply, no_content, page_query, paginated, query_form, with_state,
    AppState,
};
use crate::{
    actions::{
        add_recipe_membership, create_recipe, delete_recipe, fetch_recipes, fetch_shopping_list,
        get_recipe_mut, get_recipe_view, remove_recipe_membership, update_recipe,
        RecipeMembership,
    },
    constants::SHOPPING_LIST_FILENAME,
    error::ApiResult,
    form::Form,
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    permissions::ActionType,
    schema::{Id, RecipeFilter, ShortRecipe},
    validation::RecipePayload,
};

async fn list_recipes(
    state: AppState,
    session: Option<SessionData>,
    form: Form,
) -> ApiResult<Response> {
    let filter = RecipeFilter::from_form(&form)?;
    let page = page_query(&form, &state)?;
    let viewer = session.map(|session| session.user_id);

    let (rows, total) =
        fetch_recipes(&filter, viewer, page, &state.settings.media, &state.pool).await?;
    paginated(rows, total, page, &form, "/api/recipes/")
}

async fn get_recipe(
    id: Id,
    state: AppState,
    session: Option<SessionData>,
) -> ApiResult<Response> {
    let viewer = session.map(|session| session.user_id);
    let recipe = get_recipe_view(id, viewer, &state.settings.media, &state.pool).await?;
    Ok(json_reply(&recipe, StatusCode::OK))
}

async fn post_recipe(
    state: AppState,
    session: SessionData,
    payload: RecipePayload,
) -> ApiResult<Response> {
    session.authenticate(ActionType::CreateRecipes)?;
    let draft = payload.validate(&state.settings.limits, true)?;

    let media = &state.settings.media;
    let id = create_recipe(session.user_id, draft, media, &state.pool).await?;
    let recipe = get_recipe_view(id, Some(session.user_id), media, &state.pool).await?;
    Ok(json_reply(&recipe, StatusCode::CREATED))
}

async fn patch_recipe(
    id: Id,
    state: AppState,
    session: SessionData,
    payload: RecipePayload,
) -> ApiResult<Response> {
    let recipe = get_recipe_mut(id, &session, &state.pool).await?;
    let draft = payload.validate(&state.settings.limits, false)?;

    let media = &state.settings.media;
    update_recipe(&recipe, draft, media, &state.pool).await?;
    let recipe = get_recipe_view(id, Some(session.user_id), media, &state.pool).await?;
    Ok(json_reply(&recipe, StatusCode::OK))
}

async fn remove_recipe(id: Id, state: AppState, session: SessionData) -> ApiResult<Response> {
    let recipe = get_recipe_mut(id, &session, &state.pool).await?;
    delete_recipe(&recipe, &state.settings.media, &state.pool).await?;
    Ok(no_content())
}

async fn add_membership(
    kind: RecipeMembership,
    id: Id,
    state: AppState,
    session: SessionData,
) -> ApiResult<Response> {
    session.authenticate(kind.action())?;
    let recipe = add_recipe_membership(kind, session.user_id, id, &state.pool).await?;
    Ok(json_reply(
        &ShortRecipe::from_recipe(&recipe, &state.settings.media),
        StatusCode::CREATED,
    ))
}

async fn remove_membership(
    kind: RecipeMembership,
    id: Id,
    state: AppState,
    session: SessionData,
) -> ApiResult<Response> {
    session.authenticate(kind.action())?;
    remove_recipe_membership(kind, session.user_id, id, &state.pool).await?;
    Ok(no_content())
}

async fn download_shopping_cart(state: AppState, session: SessionData) -> ApiResult<Response> {
    session.authenticate(ActionType::ManageOwnShoppingCart)?;
    let list = fetch_shopping_list(session.user_id, &state.pool).await?;

    Ok(warp::reply::with_header(
        list.render(),
        "content-disposition",
        format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
    )
    .into_response())
}

fn membership_routes(
    state: AppState,
    segment: &'static str,
    kind: RecipeMembership,
) -> BoxedFilter<(Response,)> {
    let path = warp::path!("api" / "recipes" / Id / ..)
        .and(warp::path(segment))
        .and(warp::path::end());

    let add = path
        .clone()
        .and(warp::post())
        .map(move |id: Id| (kind, id))
        .untuple_one()
        .and(with_state(state.clone()))
        .and(with_session(state.keys.clone()))
        .then(add_membership)
        .map(finish);

    let remove = path
        .and(warp::delete())
        .map(move |id: Id| (kind, id))
        .untuple_one()
        .and(with_state(state.clone()))
        .and(with_session(state.keys.clone()))
        .then(remove_membership)
        .map(finish);

    add.or(remove).unify().boxed()
}

/// `/api/recipes/...`.
pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let keys = state.keys.clone();

    let list = warp::path!("api" / "recipes")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_possible_session(keys.clone()))
        .and(query_form())
        .then(list_recipes)
        .map(finish);

    let create = warp::path!("api" / "recipes")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .and(json_body())
        .then(post_recipe)
        .map(finish);

    let shopping_list = warp::path!("api" / "recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .then(download_shopping_cart)
        .map(finish);

    let retrieve = warp::path!("api" / "recipes" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_possible_session(keys.clone()))
        .then(get_recipe)
        .map(finish);

    let update = warp::path!("api" / "recipes" / Id)
        .and(warp::patch())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .and(json_body())
        .then(patch_recipe)
        .map(finish);

    let delete = warp::path!("api" / "recipes" / Id)
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and(with_session(keys))
        .then(remove_recipe)
        .map(finish);

    list.or(create)
        .unify()
        .or(shopping_list)
        .unify()
        .or(retrieve)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(membership_routes(
            state.clone(),
            "favorite",
            RecipeMembership::Favorite,
        ))
        .unify()
        .or(membership_routes(
            state,
            "shopping_cart",
            RecipeMembership::ShoppingCart,
        ))
        .unify()
        .boxed()
}
