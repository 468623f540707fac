//! Request handlers

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

use super::responses::{ApiResponse, PoolInfoResponse, ReserveResponse};
use super::ApiState;
use crate::domain::fee::TipPercentile;
use crate::domain::wallet::Wallet;
use crate::shared::errors::ServiceError;

type Reply<T> = Json<ApiResponse<T>>;

#[derive(Debug, Deserialize)]
pub struct InitPoolRequest {
    pub pool_id: String,
}

#[derive(Debug, Deserialize)]
pub struct InitJitoRequest {
    pub jito_tip_tick: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user: String,
}

#[derive(Debug, Deserialize)]
pub struct AddWalletRequest {
    pub user: String,
    pub address: String,
    pub mnemonic: String,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ServiceError::InvalidRequest(rejection.body_text()))
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, ServiceError> {
    params
        .map(|Query(params)| params)
        .map_err(|rejection| ServiceError::InvalidRequest(rejection.body_text()))
}

pub async fn init_pool(
    State(state): State<ApiState>,
    payload: Result<Json<InitPoolRequest>, JsonRejection>,
) -> Reply<()> {
    let result = async {
        let request = body(payload)?;
        let pool_id = Pubkey::from_str(request.pool_id.trim())
            .map_err(|e| ServiceError::InvalidRequest(format!("pool_id {}: {}", request.pool_id, e)))?;
        state.tracker.init(pool_id).await
    }
    .await;
    ApiResponse::from_result(result)
}

pub async fn get_reserve(State(state): State<ApiState>) -> Reply<ReserveResponse> {
    ApiResponse::from_result(
        state
            .tracker
            .current_value()
            .map(|snapshot| ReserveResponse::from(snapshot.as_ref())),
    )
}

pub async fn get_pool_info(State(state): State<ApiState>) -> Reply<PoolInfoResponse> {
    ApiResponse::from_result(
        state
            .tracker
            .current_value()
            .map(|snapshot| PoolInfoResponse::from(snapshot.as_ref())),
    )
}

pub async fn init_jito(
    State(state): State<ApiState>,
    payload: Result<Json<InitJitoRequest>, JsonRejection>,
) -> Reply<()> {
    let result = async {
        let tick = match body(payload)?.jito_tip_tick {
            Some(tick) => TipPercentile::from_str(&tick)?,
            None => TipPercentile::default(),
        };
        state.fees.init(tick).await
    }
    .await;
    ApiResponse::from_result(result)
}

pub async fn get_jito_tip(State(state): State<ApiState>) -> Reply<u64> {
    ApiResponse::from_result(state.fees.current_value().await.map(|fee| fee.tip_lamports))
}

pub async fn get_jito_tip_account(State(state): State<ApiState>) -> Reply<String> {
    ApiResponse::from_result(
        state
            .fees
            .current_value()
            .await
            .map(|fee| fee.tip_account.to_string()),
    )
}

/// Always reads the store and refreshes the cached entry
pub async fn list_wallets(
    State(state): State<ApiState>,
    params: Result<Query<UserQuery>, QueryRejection>,
) -> Reply<Vec<Wallet>> {
    let result = async {
        let UserQuery { user } = query(params)?;
        state.wallets.refresh(&user).await
    }
    .await;
    ApiResponse::from_result(result.map(|wallets| wallets.as_ref().clone()))
}

pub async fn cached_wallets(
    State(state): State<ApiState>,
    params: Result<Query<UserQuery>, QueryRejection>,
) -> Reply<Vec<Wallet>> {
    let result = async {
        let UserQuery { user } = query(params)?;
        state.wallets.get(&user).await
    }
    .await;
    ApiResponse::from_result(result.map(|wallets| wallets.as_ref().clone()))
}

pub async fn add_wallet(
    State(state): State<ApiState>,
    payload: Result<Json<AddWalletRequest>, JsonRejection>,
) -> Reply<()> {
    let result = async {
        let request = body(payload)?;
        state
            .wallets
            .add_wallet(&request.user, &request.address, &request.mnemonic)
            .await
            .map(|_| ())
    }
    .await;
    ApiResponse::from_result(result)
}

pub async fn invalidate_wallet_cache(
    State(state): State<ApiState>,
    params: Result<Query<UserQuery>, QueryRejection>,
) -> Reply<()> {
    let result = async {
        let UserQuery { user } = query(params)?;
        state.wallets.invalidate(&user).await;
        Ok::<_, ServiceError>(())
    }
    .await;
    ApiResponse::from_result(result)
}
