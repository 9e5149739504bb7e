use chrono::Duration;
use chrono::Utc;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::error::{ApiResult, HtmlError};
use crate::database::schema::{Id, User, UserRole};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, role: UserRole, lifetime: Duration) -> Self {
        let now = Utc::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: id,
            role,
            iat,
            exp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: Id,
    pub role: UserRole,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> ApiResult<()> {
        if !action.authenticate(self) {
            return Err(HtmlError::Forbidden.default());
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            role: value.role,
        }
    }
}

/// Signing key and token lifetime shared by every request.
#[derive(Clone)]
pub struct SessionKeys {
    key: Hmac<Sha256>,
    lifetime: Duration,
}

impl SessionKeys {
    pub fn new(secret: &[u8], lifetime_hours: i64) -> ApiResult<Self> {
        let key = Hmac::new_from_slice(secret).map_err(|e| {
            log::error!("Invalid signing key: {e}");
            HtmlError::InternalServerError.default()
        })?;

        Ok(Self {
            key,
            lifetime: Duration::hours(lifetime_hours),
        })
    }
}

pub fn generate_jwt_session(user: &User, keys: &SessionKeys) -> ApiResult<String> {
    let claims = JwtSessionData::new(user.id, user.role.to_owned(), keys.lifetime);

    claims.sign_with_key(&keys.key).map_err(|e| {
        log::error!("Failed to sign session token: {e}");
        HtmlError::InternalServerError.default()
    })
}

pub fn verify_jwt_session(token: &str, keys: &SessionKeys) -> ApiResult<JwtSessionData> {
    let session: JwtSessionData = token
        .verify_with_key(&keys.key)
        .map_err(|_| HtmlError::InvalidSession.new("Invalid token."))?;

    let now = Utc::now().timestamp();
    if (session.exp - now).is_negative() {
        return Err(HtmlError::InvalidSession.new("Token has expired."));
    }
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> User {
        User {
            id: 42,
            email: String::from("cook@example.com"),
            username: String::from("cook"),
            first_name: String::from("Ann"),
            last_name: String::from("Smith"),
            password: String::new(),
            role,
        }
    }

    #[test]
    fn issued_token_verifies_into_session() {
        let keys = SessionKeys::new(b"test-secret", 1).unwrap();
        let token = generate_jwt_session(&user(UserRole::Admin), &keys).unwrap();

        let session: SessionData = verify_jwt_session(&token, &keys).unwrap().into();
        assert_eq!(session.user_id, 42);
        assert_eq!(session.role, UserRole::Admin);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let issuer = SessionKeys::new(b"one", 1).unwrap();
        let verifier = SessionKeys::new(b"two", 1).unwrap();
        let token = generate_jwt_session(&user(UserRole::User), &issuer).unwrap();

        let error = verify_jwt_session(&token, &verifier).unwrap_err();
        assert_eq!(error.kind(), HtmlError::InvalidSession);
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = SessionKeys::new(b"test-secret", -1).unwrap();
        let token = generate_jwt_session(&user(UserRole::User), &keys).unwrap();

        let error = verify_jwt_session(&token, &keys).unwrap_err();
        assert_eq!(error.message(), "Token has expired.");
    }

    #[test]
    fn garbage_is_rejected() {
        let keys = SessionKeys::new(b"test-secret", 1).unwrap();
        assert!(verify_jwt_session("abc.def.ghi", &keys).is_err());
    }
}
