use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use log::error;
use mongodb::{bson::ser::Error as BsonError, error::Error as DbError};
use rocket::{
    http::{Status, StatusClass},
    response::{self, Responder},
    serde::json::Json,
    Request, Response,
};
use thiserror::Error;

use crate::model::api::Message;
use crate::Config;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Form is not accepting responses")]
    FormInactive,
    #[error("Required question \"{0}\" not answered")]
    MissingRequiredAnswer(String),
    #[error("{0}")]
    InvalidPayload(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Bson(#[from] BsonError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn access_denied() -> Self {
        Self::Forbidden("Access denied".to_string())
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::FormInactive
            | Self::MissingRequiredAnswer(_)
            | Self::InvalidPayload(_)
            | Self::InvalidInput(_) => Status::BadRequest,
            Self::NotFound(_) => Status::NotFound,
            Self::Forbidden(_) => Status::Forbidden,
            Self::Unauthorized(_) => Status::Unauthorized,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Db(_) | Self::Bson(_) | Self::Argon2(_) => Status::InternalServerError,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        let message = if status.class() == StatusClass::ServerError {
            error!("{self}");
            let diagnostics = req
                .rocket()
                .state::<Config>()
                .map_or(false, Config::diagnostics);
            if diagnostics {
                format!("Internal server error: {self}")
            } else {
                "Internal server error".to_string()
            }
        } else {
            self.to_string()
        };

        Response::build_from(Json(Message { message }).respond_to(req)?)
            .status(status)
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_bad_requests() {
        assert_eq!(Error::FormInactive.status(), Status::BadRequest);
        assert_eq!(
            Error::MissingRequiredAnswer("Name?".to_string()).status(),
            Status::BadRequest
        );
        assert_eq!(
            Error::InvalidPayload("Answers array is required".to_string()).status(),
            Status::BadRequest
        );
        assert_eq!(Error::access_denied().status(), Status::Forbidden);
        assert_eq!(Error::not_found("Form").status(), Status::NotFound);
    }

    #[test]
    fn messages_name_the_question() {
        let err = Error::MissingRequiredAnswer("Name?".to_string());
        assert_eq!(err.to_string(), "Required question \"Name?\" not answered");
        assert_eq!(Error::not_found("Form").to_string(), "Form not found");
    }
}
