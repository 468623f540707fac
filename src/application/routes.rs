//! Route table

use super::{handlers::*, ApiState};
use axum::{
    routing::{get, post},
    Router,
};

pub fn create_pool_routes() -> Router<ApiState> {
    Router::new()
        .route("/pool/init", post(init_pool))
        .route("/reserve", get(get_reserve))
        .route("/pool-info", get(get_pool_info))
}

pub fn create_fee_routes() -> Router<ApiState> {
    Router::new()
        .route("/jito/init", post(init_jito))
        .route("/jito-tip", get(get_jito_tip))
        .route("/jito-tip-account", get(get_jito_tip_account))
}

pub fn create_wallet_routes() -> Router<ApiState> {
    Router::new()
        .route("/wallets", get(list_wallets).post(add_wallet))
        .route("/wallets/cache", get(cached_wallets).delete(invalidate_wallet_cache))
}
