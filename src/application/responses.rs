//! Response envelope shared by every route
//!
//! Failures are reported in `msg` with HTTP 200; only authentication
//! uses a status code.

use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::domain::pool::{PoolKeys, ReserveSnapshot};
use crate::shared::errors::ServiceError;

pub const SUCCESS: &str = "success";

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub msg: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            msg: SUCCESS.to_string(),
            data: Some(data),
        })
    }

    pub fn error(msg: impl Into<String>) -> Json<Self> {
        Json(Self {
            msg: msg.into(),
            data: None,
        })
    }

    pub fn from_result(result: Result<T, ServiceError>) -> Json<Self> {
        match result {
            Ok(data) => Self::success(data),
            Err(e) => Self::error(e.to_string()),
        }
    }
}

/// `GET /reserve` payload
#[derive(Debug, Serialize)]
pub struct ReserveResponse {
    pub base_reserve: String,
    pub quote_reserve: String,
    pub status: String,
    #[serde(rename = "poolInfo")]
    pub pool_info: Value,
    #[serde(rename = "poolKeys")]
    pub pool_keys: PoolKeys,
}

impl From<&ReserveSnapshot> for ReserveResponse {
    fn from(snapshot: &ReserveSnapshot) -> Self {
        Self {
            base_reserve: snapshot.base_reserve.to_string(),
            quote_reserve: snapshot.quote_reserve.to_string(),
            status: snapshot.status.to_string(),
            pool_info: snapshot.pool_info.as_ref().clone(),
            pool_keys: snapshot.pool_keys.clone(),
        }
    }
}

/// `GET /pool-info` payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolInfoResponse {
    pub pool_info: Value,
    pub pool_keys: PoolKeys,
}

impl From<&ReserveSnapshot> for PoolInfoResponse {
    fn from(snapshot: &ReserveSnapshot) -> Self {
        Self {
            pool_info: snapshot.pool_info.as_ref().clone(),
            pool_keys: snapshot.pool_keys.clone(),
        }
    }
}
