use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use crate::logger::*;
use nanoid::nanoid;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use warp::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::reject::{
    InvalidQuery, LengthRequired, MethodNotAllowed, PayloadTooLarge, UnsupportedMediaType,
};
use warp::{Rejection, reject};

const CORRELATION_ALPHABET: [char; 16] = [
    '1', '2', '3', '4', '5', '6', '7', '8', '9', '0', 'a', 'b', 'c', 'd', 'e', 'f',
];

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let rejection = if let Some(rejection) = err.find::<ApiRejection>() {
        rejection.clone()
    } else if err.is_not_found() {
        ApiRejection::new(ApiErrorCode::NotFound)
    } else if err.find::<BodyDeserializeError>().is_some()
        || err.find::<InvalidQuery>().is_some()
        || err.find::<PayloadTooLarge>().is_some()
        || err.find::<UnsupportedMediaType>().is_some()
        || err.find::<LengthRequired>().is_some()
    {
        let rejection = ApiRejection::new(ApiErrorCode::InvalidRequest);
        debug!(correlation_id = %rejection.correlation_id, rejection = ?err, "bad request");
        rejection
    } else if err.find::<MethodNotAllowed>().is_some() {
        ApiRejection::new(ApiErrorCode::MethodNotAllowed)
    } else {
        let rejection = ApiRejection::new(ApiErrorCode::InternalError);
        error!(correlation_id = %rejection.correlation_id, rejection = ?err, "unhandled rejection");
        rejection
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(
        rejection.code.clone(),
        rejection.code.to_string(),
        rejection.correlation_id.clone(),
    ));
    Ok(warp::reply::with_status(json, rejection.code.status()))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub correlation_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Request is malformed")]
    InvalidRequest,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Service temporarily unavailable, retry later")]
    Unavailable,
    #[error("Not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// What the client gets back: a code plus an id that links to the server log.
#[derive(Debug, Clone)]
pub struct ApiRejection {
    pub code: ApiErrorCode,
    pub correlation_id: String,
}

impl ApiRejection {
    pub fn new(code: ApiErrorCode) -> Self {
        ApiRejection {
            code,
            correlation_id: nanoid!(16, &CORRELATION_ALPHABET),
        }
    }
}

impl reject::Reject for ApiRejection {}

impl From<TokenError> for ApiRejection {
    fn from(error: TokenError) -> Self {
        let code = match &error {
            TokenError::InvalidToken(_) | TokenError::Expired | TokenError::ReuseDetected(_) => {
                ApiErrorCode::InvalidToken
            }
            TokenError::Store(_) => ApiErrorCode::Unavailable,
            TokenError::Encoding(_) => ApiErrorCode::InternalError,
        };
        let rejection = ApiRejection::new(code);
        let correlation_id = &rejection.correlation_id;

        match &error {
            TokenError::ReuseDetected(user_id) => warn!(
                %correlation_id,
                %user_id,
                security_event = "refresh_token_reuse",
                "refresh rejected: {}",
                error
            ),
            TokenError::Encoding(_) => error!(%correlation_id, "token encoding failed: {}", error),
            TokenError::Store(_) => warn!(
                %correlation_id,
                retryable = error.is_retryable(),
                "credential store failed: {}",
                error
            ),
            TokenError::InvalidToken(_) | TokenError::Expired => {
                info!(%correlation_id, "token rejected: {}", error)
            }
        }
        rejection
    }
}
