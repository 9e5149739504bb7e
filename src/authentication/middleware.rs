use warp::{reject::Rejection, Filter};

use super::jwt::{verify_jwt_session, SessionData, SessionKeys};
use crate::error::{ApiResult, HtmlError};

const AUTHORIZATION_SCHEMES: &[&str] = &["Token", "Bearer"];

fn parse_authorization(header: &str, keys: &SessionKeys) -> ApiResult<SessionData> {
    let token = header
        .split_once(' ')
        .filter(|(scheme, _)| {
            AUTHORIZATION_SCHEMES
                .iter()
                .any(|known| known.eq_ignore_ascii_case(scheme))
        })
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| HtmlError::InvalidSession.new("Invalid token header."))?;

    Ok(verify_jwt_session(token, keys)?.into())
}

/// Requires a valid `Authorization: Token <jwt>` header.
pub fn with_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let keys = keys.clone();
        async move {
            match header {
                Some(header) => parse_authorization(&header, &keys).map_err(Rejection::from),
                None => Err(HtmlError::Unauthorized.default().into()),
            }
        }
    })
}

/// Anonymous requests pass through as `None`; a present but invalid token still fails.
pub fn with_possible_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let keys = keys.clone();
        async move {
            match header {
                Some(header) => parse_authorization(&header, &keys)
                    .map(Some)
                    .map_err(Rejection::from),
                None => Ok(None),
            }
        }
    })
}

/// For endpoints that ignore the caller but still refuse a bad token.
pub fn reject_invalid_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    with_possible_session(keys)
        .map(|_session: Option<SessionData>| ())
        .untuple_one()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::Error,
        jwt::generate_jwt_session,
        schema::{User, UserRole},
    };

    fn keys() -> SessionKeys {
        SessionKeys::new(b"middleware-secret", 1).unwrap()
    }

    fn token(keys: &SessionKeys) -> String {
        let user = User {
            id: 7,
            email: String::from("chef@example.com"),
            username: String::from("chef"),
            first_name: String::from("Chef"),
            last_name: String::from("Cook"),
            password: String::new(),
            role: UserRole::User,
        };
        generate_jwt_session(&user, keys).unwrap()
    }

    fn rejection_kind(rejection: Rejection) -> HtmlError {
        rejection.find::<Error>().unwrap().kind()
    }

    #[tokio::test]
    async fn token_header_yields_session() {
        let keys = keys();
        let session = warp::test::request()
            .header("authorization", format!("Token {}", token(&keys)))
            .filter(&with_session(keys))
            .await
            .unwrap();
        assert_eq!(session.user_id, 7);
        assert_eq!(session.role, UserRole::User);
    }

    #[tokio::test]
    async fn bearer_scheme_is_accepted() {
        let keys = keys();
        let session = warp::test::request()
            .header("authorization", format!("Bearer {}", token(&keys)))
            .filter(&with_possible_session(keys))
            .await
            .unwrap();
        assert_eq!(session.map(|s| s.user_id), Some(7));
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let rejection = warp::test::request()
            .filter(&with_session(keys()))
            .await
            .unwrap_err();
        assert_eq!(rejection_kind(rejection), HtmlError::Unauthorized);
    }

    #[tokio::test]
    async fn missing_header_is_anonymous_when_optional() {
        let session = warp::test::request()
            .filter(&with_possible_session(keys()))
            .await
            .unwrap();
        assert!(session.is_none());
    }

    #[tokio::test]
    async fn bad_token_fails_even_when_optional() {
        let rejection = warp::test::request()
            .header("authorization", "Token nonsense")
            .filter(&with_possible_session(keys()))
            .await
            .unwrap_err();
        assert_eq!(rejection_kind(rejection), HtmlError::InvalidSession);
    }

    #[tokio::test]
    async fn unknown_scheme_is_rejected() {
        let keys = keys();
        let rejection = warp::test::request()
            .header("authorization", format!("Basic {}", token(&keys)))
            .filter(&with_session(keys))
            .await
            .unwrap_err();
        assert_eq!(rejection_kind(rejection), HtmlError::InvalidSession);
    }
}
