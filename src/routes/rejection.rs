use std::convert::Infallible;

use warp::{
    body::BodyDeserializeError,
    reject::{
        InvalidQuery, LengthRequired, MethodNotAllowed, PayloadTooLarge, UnsupportedMediaType,
    },
    reply::Response,
    Rejection, Reply,
};

use crate::error::{Error, HtmlError};

fn classify(rejection: &Rejection) -> Error {
    if let Some(error) = rejection.find::<Error>() {
        return error.clone();
    }
    if rejection.is_not_found() {
        return HtmlError::NotFound.default();
    }
    if let Some(e) = rejection.find::<BodyDeserializeError>() {
        return HtmlError::InvalidRequest.new(&e.to_string());
    }
    if rejection.find::<InvalidQuery>().is_some() {
        return HtmlError::InvalidRequest.new("Invalid query string.");
    }
    if rejection.find::<LengthRequired>().is_some() {
        return HtmlError::InvalidRequest.new("A request body is required.");
    }
    if rejection.find::<PayloadTooLarge>().is_some() {
        return HtmlError::PayloadTooLarge.default();
    }
    if rejection.find::<UnsupportedMediaType>().is_some() {
        return HtmlError::UnsupportedMediaType.default();
    }
    if rejection.find::<MethodNotAllowed>().is_some() {
        return HtmlError::MethodNotAllowed.default();
    }

    log::error!("Unhandled rejection: {rejection:?}");
    HtmlError::InternalServerError.default()
}

/// Renders every rejection that reaches the top of the filter tree as a JSON error.
pub async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let error = classify(&rejection);
    log::debug!("Rejected request: {error}");
    Ok(error.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use warp::http::StatusCode;

    #[tokio::test]
    async fn custom_errors_keep_their_status() {
        let response = handle_rejection(HtmlError::Forbidden.default().into())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unmatched_routes_are_not_found() {
        let response = handle_rejection(warp::reject::not_found()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
