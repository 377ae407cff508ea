use std::fmt::{self, Display};

use warp::{http::StatusCode, reject::Reject, Rejection};

/// Error carried through warp rejections and rendered as the response body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{info}")]
pub struct Error {
    pub code: u16,
    pub info: String,
}

impl Error {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl Reject for Error {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlError {
    InvalidRequest,
    Unauthorized,
    InvalidSession,
    NotFound,
    MethodNotAllowed,
    LengthRequired,
    PayloadTooLarge,
    UnsupportedMediaType,
    InternalServerError,
}

impl HtmlError {
    pub fn code(&self) -> u16 {
        match self {
            HtmlError::InvalidRequest => 400,
            HtmlError::Unauthorized | HtmlError::InvalidSession => 401,
            HtmlError::NotFound => 404,
            HtmlError::MethodNotAllowed => 405,
            HtmlError::LengthRequired => 411,
            HtmlError::PayloadTooLarge => 413,
            HtmlError::UnsupportedMediaType => 415,
            HtmlError::InternalServerError => 500,
        }
    }

    pub fn new(self, info: &str) -> Error {
        Error {
            code: self.code(),
            info: info.to_string(),
        }
    }

    pub fn default(self) -> Error {
        let info = match self {
            HtmlError::InvalidRequest => "Invalid request",
            HtmlError::Unauthorized => "Authentication credentials were not provided",
            HtmlError::InvalidSession => "Invalid session",
            HtmlError::NotFound => "Not found",
            HtmlError::MethodNotAllowed => "Method not allowed",
            HtmlError::LengthRequired => "Length required",
            HtmlError::PayloadTooLarge => "Payload too large",
            HtmlError::UnsupportedMediaType => "Unsupported media type",
            HtmlError::InternalServerError => "Internal server error",
        };

        self.new(info)
    }
}

#[derive(Debug)]
pub struct QueryError {
    info: String,
    unique_violation: bool,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            info,
            unique_violation: false,
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => Self {
                info: e.to_string(),
                unique_violation: e.is_unique_violation(),
            },
            other => Self::new(other.to_string()),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        if value.unique_violation {
            return HtmlError::InvalidRequest.new("An entry with this value already exists");
        }

        log::error!("Query failed: {}", value.info);
        HtmlError::InternalServerError.default()
    }
}

/// Request payload failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }

    pub fn field(field: &str, info: &str) -> Self {
        Self {
            info: format!("{field}: {info}"),
        }
    }
}

impl From<TypeError> for Error {
    fn from(value: TypeError) -> Self {
        HtmlError::InvalidRequest.new(&value.info)
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

impl From<TypeError> for Rejection {
    fn from(value: TypeError) -> Self {
        Error::from(value).into()
    }
}
