use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::error::{Error, HtmlError};
use crate::database::schema::{User, Uuid};

/// Signing key and token lifetime shared by every request.
#[derive(Clone)]
pub struct SessionKeys {
    key: Hmac<Sha256>,
    lifetime_hours: i64,
}

impl SessionKeys {
    pub fn new(secret: &[u8], lifetime_hours: i64) -> Result<Self, Error> {
        let key = Hmac::new_from_slice(secret)
            .map_err(|_| HtmlError::InternalServerError.new("Invalid session secret"))?;

        Ok(Self {
            key,
            lifetime_hours,
        })
    }

    pub fn lifetime_hours(&self) -> i64 {
        self.lifetime_hours
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Uuid,
    pub email: String,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Uuid, email: String, lifetime_hours: i64) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(lifetime_hours)).timestamp();

        Self {
            user_id: id,
            email,
            iat,
            exp,
        }
    }
}

/// The authenticated caller.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: Uuid,
    pub email: String,
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        Self {
            user_id: value.user_id,
            email: value.email,
        }
    }
}

pub fn generate_jwt_session(user: &User, keys: &SessionKeys) -> Result<String, Error> {
    let claims = JwtSessionData::new(user.id, user.email.to_owned(), keys.lifetime_hours);

    claims.sign_with_key(&keys.key).map_err(|e| {
        log::error!("Could not sign session for user {}: {e}", user.id);
        HtmlError::InternalServerError.default()
    })
}

pub fn verify_jwt_session(token: &str, keys: &SessionKeys) -> Result<JwtSessionData, Error> {
    let session: JwtSessionData = token
        .verify_with_key(&keys.key)
        .map_err(|_| HtmlError::InvalidSession.new("Invalid session; Invalid token"))?;

    let now = Local::now().timestamp();
    if session.exp <= now {
        return Err(HtmlError::InvalidSession.new("Invalid session; Token expired"));
    }

    Ok(session)
}
