use std::sync::Arc;

use warp::{reject::Rejection, Filter};

use super::jwt::{verify_jwt_session, SessionData, SessionKeys};
use crate::{
    constants::SESSION_COOKIE,
    database::error::{Error, HtmlError},
};

/// Strips the `Bearer` or `Token` scheme from an `Authorization` header.
fn header_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") && !scheme.eq_ignore_ascii_case("token") {
        return None;
    }

    Some(token.trim()).filter(|t| !t.is_empty())
}

fn authenticate(
    header: Option<String>,
    cookie: Option<String>,
    keys: &SessionKeys,
) -> Result<SessionData, Error> {
    let token = header
        .as_deref()
        .and_then(header_token)
        .map(str::to_owned)
        .or(cookie)
        .ok_or_else(|| HtmlError::Unauthorized.default())?;

    Ok(verify_jwt_session(&token, keys)?.into())
}

/// Requires a valid session from the `Authorization` header or the session cookie.
pub fn with_session(
    keys: Arc<SessionKeys>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::cookie::optional::<String>(SESSION_COOKIE))
        .and_then(move |header: Option<String>, cookie: Option<String>| {
            let keys = keys.clone();
            async move {
                authenticate(header, cookie, &keys).map_err(|e| {
                    log::debug!("Rejected request: {}", e.info);
                    Rejection::from(e)
                })
            }
        })
}
