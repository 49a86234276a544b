use super::error::*;
use crate::application_port::*;
use crate::domain_model::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(
        code: ApiErrorCode,
        message: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
                correlation_id: correlation_id.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IssueQuery {
    #[serde(rename = "user-uuid")]
    pub user_uuid: UserId,
}

/// The identifier is assumed to be authenticated upstream.
pub async fn issue_tokens(
    query: IssueQuery,
    token_service: Arc<dyn TokenPairService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let pair = token_service
        .issue_pair(query.user_uuid)
        .await
        .map_err(ApiRejection::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(pair)))
}

pub async fn refresh_tokens(
    body: TokenPair,
    token_service: Arc<dyn TokenPairService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let pair = token_service
        .refresh(&body)
        .await
        .map_err(ApiRejection::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(pair)))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub async fn health() -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&ApiResponse::ok(HealthResponse {
        status: "ok",
    })))
}
