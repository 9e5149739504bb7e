use std::fmt::{self, Display};

use serde_json::{Map, Value};
use warp::{
    http::StatusCode,
    reject::Reject,
    reply::Response,
    Reply,
};

pub type ApiResult<T> = Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlError {
    InvalidRequest,
    Unauthorized,
    InvalidSession,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    PayloadTooLarge,
    UnsupportedMediaType,
    InternalServerError,
}

impl HtmlError {
    pub fn new(self, info: &str) -> Error {
        Error {
            kind: self,
            info: Some(info.to_owned()),
            field: None,
        }
    }

    /// Attaches the message to a request field, rendered as `{"<field>": ["<info>"]}`.
    pub fn field(self, field: &str, info: &str) -> Error {
        Error {
            kind: self,
            info: Some(info.to_owned()),
            field: Some(field.to_owned()),
        }
    }

    pub fn default(self) -> Error {
        Error {
            kind: self,
            info: None,
            field: None,
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            HtmlError::InvalidRequest => StatusCode::BAD_REQUEST,
            HtmlError::Unauthorized | HtmlError::InvalidSession => StatusCode::UNAUTHORIZED,
            HtmlError::Forbidden => StatusCode::FORBIDDEN,
            HtmlError::NotFound => StatusCode::NOT_FOUND,
            HtmlError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            HtmlError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            HtmlError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            HtmlError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn default_info(self) -> &'static str {
        match self {
            HtmlError::InvalidRequest => "Invalid request.",
            HtmlError::Unauthorized => "Authentication credentials were not provided.",
            HtmlError::InvalidSession => "Invalid token.",
            HtmlError::Forbidden => "You do not have permission to perform this action.",
            HtmlError::NotFound => "Not found.",
            HtmlError::MethodNotAllowed => "Method not allowed.",
            HtmlError::PayloadTooLarge => "Request body is too large.",
            HtmlError::UnsupportedMediaType => "Unsupported media type.",
            HtmlError::InternalServerError => "Internal server error.",
        }
    }
}

/// Request-local failure carried through handlers and rendered by the rejection handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: HtmlError,
    info: Option<String>,
    field: Option<String>,
}

impl Error {
    pub fn kind(&self) -> HtmlError {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn message(&self) -> &str {
        self.info
            .as_deref()
            .unwrap_or_else(|| self.kind.default_info())
    }

    pub fn body(&self) -> Value {
        let mut body = Map::new();
        match (&self.field, self.kind) {
            (Some(field), _) => {
                body.insert(
                    field.to_owned(),
                    Value::Array(vec![Value::String(self.message().to_owned())]),
                );
            }
            (None, HtmlError::InvalidRequest) => {
                body.insert(
                    String::from("errors"),
                    Value::String(self.message().to_owned()),
                );
            }
            (None, _) => {
                body.insert(
                    String::from("detail"),
                    Value::String(self.message().to_owned()),
                );
            }
        }
        Value::Object(body)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{} ({field}: {})", self.status(), self.message()),
            None => write!(f, "{} ({})", self.status(), self.message()),
        }
    }
}

impl std::error::Error for Error {}

impl Reject for Error {}

impl Reply for Error {
    fn into_response(self) -> Response {
        warp::reply::with_status(warp::reply::json(&self.body()), self.status()).into_response()
    }
}

/// Database failure classified by the constraint that produced it.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("unique constraint `{0}` violated")]
    UniqueViolation(String),
    #[error("foreign key constraint `{0}` violated")]
    ForeignKeyViolation(String),
    #[error("check constraint `{0}` violated")]
    CheckViolation(String),
    #[error("row not found")]
    RowNotFound,
    #[error("pool timed out")]
    PoolTimedOut,
    #[error(transparent)]
    Database(sqlx::Error),
}

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => {
                let constraint = e.constraint().unwrap_or_default().to_owned();
                let code = e.code().map(|code| code.into_owned());
                match code.as_deref() {
                    Some(UNIQUE_VIOLATION) => Self::UniqueViolation(constraint),
                    Some(FOREIGN_KEY_VIOLATION) => Self::ForeignKeyViolation(constraint),
                    Some(CHECK_VIOLATION) => Self::CheckViolation(constraint),
                    _ => Self::Database(sqlx::Error::Database(e)),
                }
            }
            sqlx::Error::RowNotFound => Self::RowNotFound,
            sqlx::Error::PoolTimedOut => Self::PoolTimedOut,
            e => Self::Database(e),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        match value {
            QueryError::UniqueViolation(constraint) => constraint_error(&constraint),
            QueryError::CheckViolation(constraint) => constraint_error(&constraint),
            QueryError::ForeignKeyViolation(constraint) => {
                log::debug!("Foreign key violation on {constraint}");
                HtmlError::NotFound.default()
            }
            QueryError::RowNotFound => HtmlError::NotFound.default(),
            e => {
                log::error!("Database error: {e}");
                HtmlError::InternalServerError.default()
            }
        }
    }
}

/// Maps a violated constraint from the schema to the message shown to the client.
pub fn constraint_error(constraint: &str) -> Error {
    match constraint {
        "unique_user_email" => {
            HtmlError::InvalidRequest.field("email", "A user with that email already exists.")
        }
        "unique_username" => HtmlError::InvalidRequest
            .field("username", "A user with that username already exists."),
        "unique_author_name" => HtmlError::InvalidRequest
            .field("name", "You already have a recipe with this name."),
        "unique_recipe_ingredient" => {
            HtmlError::InvalidRequest.field("ingredients", "Ingredients must not repeat.")
        }
        "unique_favorite_recipes" => {
            HtmlError::InvalidRequest.new("Recipe is already in favorites.")
        }
        "unique_cart_user_recipes" => {
            HtmlError::InvalidRequest.new("Recipe is already in the shopping cart.")
        }
        "unique_subscription" => {
            HtmlError::InvalidRequest.new("You are already subscribed to this author.")
        }
        "no_self_subscription" => {
            HtmlError::InvalidRequest.new("You cannot subscribe to yourself.")
        }
        "cooking_time_positive" => {
            HtmlError::InvalidRequest.field("cooking_time", "Cooking time is too short.")
        }
        "amount_positive" => {
            HtmlError::InvalidRequest.field("ingredients", "Ingredient amount is too small.")
        }
        _ => HtmlError::InvalidRequest.default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_errors_render_as_lists() {
        let error = HtmlError::InvalidRequest.field("cooking_time", "Too short.");
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.body(), json!({ "cooking_time": ["Too short."] }));
    }

    #[test]
    fn conflicts_render_under_errors() {
        let error = HtmlError::InvalidRequest.new("Recipe is already in favorites.");
        assert_eq!(
            error.body(),
            json!({ "errors": "Recipe is already in favorites." })
        );
    }

    #[test]
    fn other_kinds_render_detail_with_default_message() {
        let error = HtmlError::NotFound.default();
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(error.body(), json!({ "detail": "Not found." }));
    }

    #[test]
    fn known_constraints_map_to_client_messages() {
        assert_eq!(constraint_error("unique_author_name").field(), Some("name"));
        assert_eq!(
            constraint_error("no_self_subscription").message(),
            "You cannot subscribe to yourself."
        );
        assert_eq!(
            constraint_error("something_else").kind(),
            HtmlError::InvalidRequest
        );
    }

    #[test]
    fn errors_travel_as_rejections() {
        let rejection = warp::Rejection::from(HtmlError::Forbidden.new("Not yours."));
        let error = rejection.find::<Error>().unwrap();
        assert_eq!(error.kind(), HtmlError::Forbidden);
        assert_eq!(error.message(), "Not yours.");
    }

    #[test]
    fn missing_rows_are_not_found() {
        let error: Error = QueryError::from(sqlx::Error::RowNotFound).into();
        assert_eq!(error.kind(), HtmlError::NotFound);
    }

    #[test]
    fn unclassified_database_errors_are_internal() {
        let error: Error = QueryError::from(sqlx::Error::PoolClosed).into();
        assert_eq!(error.kind(), HtmlError::InternalServerError);
        assert_eq!(error.body(), json!({ "detail": "Internal server error." }));
    }
}
