use std::convert::Infallible;

use serde::Serialize;
use warp::{
    body::BodyDeserializeError,
    reject::{
        InvalidHeader, InvalidQuery, LengthRequired, MethodNotAllowed, MissingHeader,
        PayloadTooLarge, UnsupportedMediaType,
    },
    Rejection, Reply,
};

use crate::database::error::{Error, HtmlError};

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: u16,
    error: &'a str,
}

fn classify(err: &Rejection) -> Error {
    if let Some(e) = err.find::<Error>() {
        return e.clone();
    }
    if let Some(e) = err.find::<BodyDeserializeError>() {
        return HtmlError::InvalidRequest.new(&e.to_string());
    }
    if let Some(e) = err.find::<InvalidQuery>() {
        return HtmlError::InvalidRequest.new(&e.to_string());
    }
    if let Some(e) = err.find::<MissingHeader>() {
        return HtmlError::InvalidRequest.new(&e.to_string());
    }
    if let Some(e) = err.find::<InvalidHeader>() {
        return HtmlError::InvalidRequest.new(&e.to_string());
    }
    if err.find::<LengthRequired>().is_some() {
        return HtmlError::LengthRequired.default();
    }
    if err.find::<PayloadTooLarge>().is_some() {
        return HtmlError::PayloadTooLarge.default();
    }
    if err.find::<UnsupportedMediaType>().is_some() {
        return HtmlError::UnsupportedMediaType.default();
    }
    if err.find::<MethodNotAllowed>().is_some() {
        return HtmlError::MethodNotAllowed.default();
    }
    if err.is_not_found() {
        return HtmlError::NotFound.default();
    }

    log::error!("Unhandled rejection: {err:?}");
    HtmlError::InternalServerError.default()
}

/// Renders every rejection as `{"code": .., "error": ..}`.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let error = classify(&err);
    let body = ErrorBody {
        code: error.code,
        error: &error.info,
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&body),
        error.status(),
    ))
}
