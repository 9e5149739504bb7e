use std::{convert::Infallible, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use sqlx::{Pool, Postgres};
use warp::{
    http::StatusCode,
    reject::Rejection,
    reply::Response,
    Filter, Reply,
};

use crate::{
    config::Settings,
    constants::MAX_BODY_SIZE,
    error::{ApiResult, Error},
    form::{Form, FormData},
    jwt::SessionKeys,
    pagination::{PageContext, PageQuery},
};

mod catalogue;
mod recipes;
mod rejection;
mod users;

pub use rejection::handle_rejection;

/// Everything a handler needs besides the request itself.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Postgres>,
    pub keys: SessionKeys,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(pool: Pool<Postgres>, keys: SessionKeys, settings: Settings) -> Self {
        Self {
            pool,
            keys,
            settings: Arc::new(settings),
        }
    }
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_SIZE).and(warp::body::json())
}

fn query_form() -> impl Filter<Extract = (Form,), Error = Rejection> + Clone {
    warp::query::<FormData>().map(Form::from_data)
}

fn json_reply<T: Serialize>(value: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(value), status).into_response()
}

fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Handler errors become responses here instead of rejections, so a failed handler
/// does not fall through to sibling routes.
fn finish(result: ApiResult<Response>) -> Response {
    result.unwrap_or_else(Error::into_response)
}

/// Parses `page`/`limit` from the query, with the configured page size as default.
fn page_query(form: &Form, state: &AppState) -> ApiResult<PageQuery> {
    PageQuery::from_form(form, state.settings.page_size)
}

fn paginated<T: Serialize>(
    rows: Vec<T>,
    total: i64,
    page: PageQuery,
    form: &Form,
    path: &str,
) -> ApiResult<Response> {
    let context = PageContext::from_rows(rows, total, page, form, path)?;
    Ok(json_reply(&context, StatusCode::OK))
}

/// The JSON API under `/api/`.
pub fn api(state: AppState) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    users::routes(state.clone())
        .or(recipes::routes(state.clone()))
        .unify()
        .or(catalogue::routes(state))
        .unify()
}

/// The API plus uploaded media, request logging and error rendering.
pub fn app(state: AppState) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let media = warp::path("media")
        .and(warp::get())
        .and(warp::fs::dir(state.settings.media.root().to_path_buf()))
        .map(|file: warp::fs::File| file.into_response());

    api(state)
        .or(media)
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(warp::log("foodgram::http"))
}
