//! HTTP API over the tracker, fee poller and wallet cache

mod auth;
mod handlers;
mod responses;
mod routes;

pub use responses::ApiResponse;
pub use routes::*;

use anyhow::Result;
use axum::{middleware, Router};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::domain::fee::FeePoller;
use crate::domain::pool::TrackerHandle;
use crate::domain::wallet::WalletCache;
use crate::shared::utils::bearer_token;

/// Shared API state
#[derive(Clone)]
pub struct ApiState {
    pub tracker: TrackerHandle,
    pub fees: Arc<FeePoller>,
    pub wallets: Arc<WalletCache>,
    bearer: Arc<str>,
}

impl ApiState {
    pub fn new(tracker: TrackerHandle, fees: Arc<FeePoller>, wallets: Arc<WalletCache>, auth_secret: &str) -> Self {
        Self {
            tracker,
            fees,
            wallets,
            bearer: Arc::from(bearer_token(auth_secret)),
        }
    }

    pub fn bearer_token(&self) -> &str {
        &self.bearer
    }
}

/// Every route, behind bearer auth
pub fn create_app(state: ApiState) -> Router {
    Router::new()
        .merge(create_pool_routes())
        .merge(create_fee_routes())
        .merge(create_wallet_routes())
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_bearer))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Serves `app` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("🌐 API server listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fee::{PollerIntervals, TipPercentile, TipSource};
    use crate::domain::pool::layout::sample_descriptor;
    use crate::domain::pool::{AccountNotifier, FetchedPool, PoolSource};
    use crate::infrastructure::storage::SqliteWalletStore;
    use crate::shared::errors::ServiceError;
    use crate::shared::types::{AccountEvent, SubscriptionId};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use solana_sdk::pubkey::Pubkey;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    const SECRET: &str = "https://rpc.example";

    struct StaticPool;

    #[async_trait]
    impl PoolSource for StaticPool {
        async fn fetch_pool(&self, pool_id: &Pubkey) -> Result<FetchedPool, ServiceError> {
            Ok(FetchedPool {
                pool_id: *pool_id,
                program_id: Pubkey::new_unique(),
                descriptor: sample_descriptor(),
                base_vault_amount: 1000,
                quote_vault_amount: 2000,
                pool_info: json!({ "type": "Standard", "id": pool_id.to_string() }),
            })
        }
    }

    #[derive(Default)]
    struct SilentNotifier {
        next_id: AtomicU64,
    }

    #[async_trait]
    impl AccountNotifier for SilentNotifier {
        async fn subscribe(
            &self,
            _account: Pubkey,
            _sink: mpsc::UnboundedSender<AccountEvent>,
        ) -> Result<SubscriptionId, ServiceError> {
            Ok(SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst)))
        }

        async fn unsubscribe(&self, _id: SubscriptionId) -> Result<(), ServiceError> {
            Ok(())
        }
    }

    struct FixedTips(Pubkey);

    #[async_trait]
    impl TipSource for FixedTips {
        async fn tip_lamports(&self, tick: TipPercentile) -> Result<u64, ServiceError> {
            Ok(match tick {
                TipPercentile::Landed99th => 99_000,
                _ => 1_000,
            })
        }

        async fn random_tip_account(&self) -> Result<Pubkey, ServiceError> {
            Ok(self.0)
        }
    }

    fn app() -> (Router, Pubkey) {
        let tip_account = Pubkey::new_unique();
        let tracker = TrackerHandle::spawn(Arc::new(StaticPool), Arc::new(SilentNotifier::default()));
        let fees = Arc::new(FeePoller::new(Arc::new(FixedTips(tip_account)), PollerIntervals::default()));
        let store = SqliteWalletStore::open_in_memory().unwrap();
        let wallets = Arc::new(WalletCache::new(Arc::new(store)));
        (create_app(ApiState::new(tracker, fees, wallets, SECRET)), tip_account)
    }

    fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", bearer_token(SECRET)));
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn call(app: &Router, request: Request<Body>) -> Value {
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_or_wrong_token_is_unauthorized() {
        let (app, _) = app();

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/reserve").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Unauthorized");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/jito-tip")
                    .header(header::AUTHORIZATION, "Bearer not-the-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_padded_token_is_unauthorized() {
        let (app, _) = app();
        let token = bearer_token(SECRET);

        for value in [format!("Bearer  {}", token), format!("Bearer {}\t", token)] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .uri("/reserve")
                        .header(header::AUTHORIZATION, value.as_str())
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{:?}", value);
        }
    }

    #[tokio::test]
    async fn test_reads_before_init_report_uninitialized() {
        let (app, _) = app();
        for uri in ["/reserve", "/pool-info", "/jito-tip", "/jito-tip-account"] {
            let body = call(&app, request(Method::GET, uri, None)).await;
            assert_eq!(body, json!({ "msg": "server is not initialised", "data": null }), "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_pool_init_then_reserve() {
        let (app, _) = app();
        let pool_id = Pubkey::new_unique();

        let body = call(
            &app,
            request(Method::POST, "/pool/init", Some(json!({ "pool_id": pool_id.to_string() }))),
        )
        .await;
        assert_eq!(body, json!({ "msg": "success", "data": null }));

        let body = call(&app, request(Method::GET, "/reserve", None)).await;
        assert_eq!(body["msg"], "success");
        let data = &body["data"];
        assert_eq!(data["base_reserve"], "990");
        assert_eq!(data["quote_reserve"], "1980");
        assert_eq!(data["status"], "6");
        assert_eq!(data["poolInfo"]["type"], "Standard");
        assert_eq!(data["poolKeys"]["id"], pool_id.to_string());
        assert_eq!(data["poolKeys"]["mintA"]["decimals"], 9);

        let body = call(&app, request(Method::GET, "/pool-info", None)).await;
        assert_eq!(body["data"]["poolInfo"]["id"], pool_id.to_string());
        assert_eq!(body["data"]["poolKeys"]["id"], pool_id.to_string());
        assert!(body["data"].get("base_reserve").is_none());
    }

    #[tokio::test]
    async fn test_pool_init_rejects_bad_input() {
        let (app, _) = app();

        let body = call(
            &app,
            request(Method::POST, "/pool/init", Some(json!({ "pool_id": "not-a-key" }))),
        )
        .await;
        assert!(body["msg"].as_str().unwrap().starts_with("invalid request: pool_id not-a-key"));
        assert_eq!(body["data"], Value::Null);

        let body = call(&app, request(Method::POST, "/pool/init", Some(json!({ "pool": 1 })))).await;
        assert!(body["msg"].as_str().unwrap().starts_with("invalid request"));
        assert_eq!(body["data"], Value::Null);
    }

    #[tokio::test]
    async fn test_jito_init_and_reads() {
        let (app, tip_account) = app();

        let body = call(&app, request(Method::POST, "/jito/init", Some(json!({})))).await;
        assert_eq!(body["msg"], "success");
        let body = call(&app, request(Method::GET, "/jito-tip", None)).await;
        assert_eq!(body, json!({ "msg": "success", "data": 1000 }));

        let body = call(
            &app,
            request(
                Method::POST,
                "/jito/init",
                Some(json!({ "jito_tip_tick": "landed_tips_99th_percentile" })),
            ),
        )
        .await;
        assert_eq!(body["msg"], "success");
        let body = call(&app, request(Method::GET, "/jito-tip", None)).await;
        assert_eq!(body["data"], 99_000);

        let body = call(&app, request(Method::GET, "/jito-tip-account", None)).await;
        assert_eq!(body["data"], tip_account.to_string());

        let body = call(
            &app,
            request(Method::POST, "/jito/init", Some(json!({ "jito_tip_tick": "median" }))),
        )
        .await;
        assert_eq!(body["msg"], "invalid request: unknown tip tick: median");
    }

    #[tokio::test]
    async fn test_wallet_routes() {
        let (app, _) = app();

        let body = call(&app, request(Method::GET, "/wallets/cache?user=alice", None)).await;
        assert_eq!(body, json!({ "msg": "success", "data": [] }));

        let body = call(
            &app,
            request(
                Method::POST,
                "/wallets",
                Some(json!({ "user": "alice", "address": "addr1", "mnemonic": "one two" })),
            ),
        )
        .await;
        assert_eq!(body["msg"], "success");

        let body = call(&app, request(Method::GET, "/wallets/cache?user=alice", None)).await;
        let wallets = body["data"].as_array().unwrap();
        assert_eq!(wallets.len(), 1);
        assert_eq!(wallets[0]["address"], "addr1");
        assert_eq!(wallets[0]["mnemonic"], "one two");

        let body = call(&app, request(Method::GET, "/wallets?user=alice", None)).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let body = call(&app, request(Method::DELETE, "/wallets/cache?user=alice", None)).await;
        assert_eq!(body, json!({ "msg": "success", "data": null }));

        let body = call(&app, request(Method::GET, "/wallets", None)).await;
        assert!(body["msg"].as_str().unwrap().starts_with("invalid request"));
        assert_eq!(body["data"], Value::Null);
    }
}
