use serde::Serialize;
use warp::{filters::BoxedFilter, http::StatusCode, reply::Response, Filter};

use super::{
    finish, json_body, json_reply, no_content, page_query, paginated, query_form, with_state,
    AppState,
};
use crate::{
    actions::{
        fetch_subscriptions, fetch_users, get_user_row, login_user, register_user, set_password,
        subscribe, unsubscribe,
    },
    error::ApiResult,
    form::Form,
    jwt::SessionData,
    middleware::{reject_invalid_session, with_possible_session, with_session},
    permissions::ActionType,
    schema::{CreatedUser, Id},
    validation::{LoginPayload, SetPasswordPayload, UserPayload},
};

#[derive(Serialize)]
struct TokenResponse {
    auth_token: String,
}

fn recipes_limit(form: &Form) -> ApiResult<Option<usize>> {
    form.get_number::<usize>("recipes_limit")
}

async fn list_users(
    state: AppState,
    session: Option<SessionData>,
    form: Form,
) -> ApiResult<Response> {
    let page = page_query(&form, &state)?;
    let viewer = session.map(|session| session.user_id);
    let (rows, total) = fetch_users(viewer, page, &state.pool).await?;
    paginated(rows, total, page, &form, "/api/users/")
}

async fn create_user(state: AppState, payload: UserPayload) -> ApiResult<Response> {
    let user = payload.validate()?;
    let created = register_user(user, &state.pool).await?;
    Ok(json_reply(&CreatedUser::from(&created), StatusCode::CREATED))
}

async fn get_user(
    id: Id,
    state: AppState,
    session: Option<SessionData>,
) -> ApiResult<Response> {
    let viewer = session.map(|session| session.user_id);
    let user = get_user_row(id, viewer, &state.pool).await?;
    Ok(json_reply(&user, StatusCode::OK))
}

async fn current_user(state: AppState, session: SessionData) -> ApiResult<Response> {
    let user = get_user_row(session.user_id, Some(session.user_id), &state.pool).await?;
    Ok(json_reply(&user, StatusCode::OK))
}

async fn change_password(
    state: AppState,
    session: SessionData,
    payload: SetPasswordPayload,
) -> ApiResult<Response> {
    let (current, new) = payload.validate()?;
    set_password(session.user_id, &current, &new, &state.pool).await?;
    log::info!("User {} changed their password", session.user_id);
    Ok(no_content())
}

async fn list_subscriptions(
    state: AppState,
    session: SessionData,
    form: Form,
) -> ApiResult<Response> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    let page = page_query(&form, &state)?;
    let limit = recipes_limit(&form)?;

    let (rows, total) = fetch_subscriptions(
        session.user_id,
        page,
        limit,
        &state.settings.media,
        &state.pool,
    )
    .await?;
    paginated(rows, total, page, &form, "/api/users/subscriptions/")
}

async fn add_subscription(
    id: Id,
    state: AppState,
    session: SessionData,
    form: Form,
) -> ApiResult<Response> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    let limit = recipes_limit(&form)?;

    let view = subscribe(
        session.user_id,
        id,
        limit,
        &state.settings.media,
        &state.pool,
    )
    .await?;
    Ok(json_reply(&view, StatusCode::CREATED))
}

async fn remove_subscription(
    id: Id,
    state: AppState,
    session: SessionData,
) -> ApiResult<Response> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    unsubscribe(session.user_id, id, &state.pool).await?;
    Ok(no_content())
}

async fn issue_token(state: AppState, payload: LoginPayload) -> ApiResult<Response> {
    let (email, password) = payload.validate()?;
    let auth_token = login_user(&email, &password, &state.keys, &state.pool).await?;
    Ok(json_reply(&TokenResponse { auth_token }, StatusCode::OK))
}

/// Tokens are stateless; they lapse when they expire.
async fn revoke_token(_session: SessionData) -> ApiResult<Response> {
    Ok(no_content())
}

/// `/api/users/...` and `/api/auth/token/...`.
pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let keys = state.keys.clone();

    let list = warp::path!("api" / "users")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_possible_session(keys.clone()))
        .and(query_form())
        .then(list_users)
        .map(finish);

    let create = warp::path!("api" / "users")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(reject_invalid_session(keys.clone()))
        .and(json_body())
        .then(create_user)
        .map(finish);

    let me = warp::path!("api" / "users" / "me")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .then(current_user)
        .map(finish);

    let set_password = warp::path!("api" / "users" / "set_password")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .and(json_body())
        .then(change_password)
        .map(finish);

    let subscriptions = warp::path!("api" / "users" / "subscriptions")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .and(query_form())
        .then(list_subscriptions)
        .map(finish);

    let retrieve = warp::path!("api" / "users" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_possible_session(keys.clone()))
        .then(get_user)
        .map(finish);

    let subscribe = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .and(query_form())
        .then(add_subscription)
        .map(finish);

    let unsubscribe = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .then(remove_subscription)
        .map(finish);

    let login = warp::path!("api" / "auth" / "token" / "login")
        .and(warp::post())
        .and(with_state(state))
        .and(reject_invalid_session(keys.clone()))
        .and(json_body())
        .then(issue_token)
        .map(finish);

    let logout = warp::path!("api" / "auth" / "token" / "logout")
        .and(warp::post())
        .and(with_session(keys))
        .then(revoke_token)
        .map(finish);

    list.or(create)
        .unify()
        .or(me)
        .unify()
        .or(set_password)
        .unify()
        .or(subscriptions)
        .unify()
        .or(retrieve)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
        .or(login)
        .unify()
        .or(logout)
        .unify()
        .boxed()
}
