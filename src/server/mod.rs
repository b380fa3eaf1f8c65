//! HTTP dashboard: JSON API plus the static web app.

mod error;
mod handlers;

pub use error::ApiError;
pub use handlers::DashboardData;

use crate::advisor::Advisor;
use crate::config::ServerConfig;
use crate::exchange::AccountDataProvider;
use anyhow::{Context, Result};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn AccountDataProvider>,
    pub advisor: Arc<Advisor>,
}

impl AppState {
    pub fn new(provider: Arc<dyn AccountDataProvider>, advisor: Advisor) -> Self {
        Self {
            provider,
            advisor: Arc::new(advisor),
        }
    }
}

/// Build the router: API routes, `index.html` at `/`, and `/css`, `/js` assets.
pub fn router(state: AppState, static_dir: impl Into<PathBuf>) -> Router {
    let static_dir = static_dir.into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/data", get(handlers::get_data))
        .route("/api/trades", get(handlers::get_trades))
        .route("/api/health", get(handlers::health_check))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/css", ServeDir::new(static_dir.join("css")))
        .nest_service("/js", ServeDir::new(static_dir.join("js")))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: &ServerConfig, state: AppState) -> Result<()> {
    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.bind_addr))?;

    let app = router(state, &config.static_dir);

    info!(?addr, static_dir = %config.static_dir, "🚀 Dashboard server starting");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app)
        .await
        .context("Dashboard server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AiConfig;
    use crate::exchange::{
        ClosedPnl, ExchangeError, MockAccountDataProvider, RawOrder, RawPosition, WalletBalance,
    };
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app(mock: MockAccountDataProvider, static_dir: &std::path::Path) -> Router {
        let advisor = Advisor::new(&AiConfig::default()).unwrap();
        router(AppState::new(Arc::new(mock), advisor), static_dir)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn populated_mock() -> MockAccountDataProvider {
        let mut mock = MockAccountDataProvider::new();
        mock.expect_get_wallet_balance().returning(|| {
            Ok(WalletBalance {
                total_equity: "10000".to_string(),
                total_margin_balance: "10000".to_string(),
                total_initial_margin: "7000".to_string(),
                ..WalletBalance::default()
            })
        });
        mock.expect_get_positions().returning(|| {
            Ok(vec![RawPosition {
                symbol: "BTCUSDT".to_string(),
                side: "Buy".to_string(),
                size: "0.5".to_string(),
                mark_price: "43200".to_string(),
                liq_price: "38880".to_string(),
                leverage: "12.5".to_string(),
                unrealised_pnl: "-25".to_string(),
                ..RawPosition::default()
            }])
        });
        mock.expect_get_open_orders()
            .returning(|| Ok(vec![RawOrder::default()]));
        mock.expect_get_closed_pnl()
            .withf(|start, limit| start.is_some() && *limit == DAILY_LIMIT)
            .returning(|_, _| {
                Ok(vec![ClosedPnl {
                    closed_pnl: "125".to_string(),
                    ..ClosedPnl::default()
                }])
            });
        mock
    }

    const DAILY_LIMIT: usize = crate::analysis::DAILY_CLOSED_PNL_LIMIT;

    #[tokio::test]
    async fn test_api_data_shape() {
        let dir = std::env::temp_dir();
        let (status, json) = get_json(app(populated_mock(), &dir), "/api/data").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["balance"]["totalEquity"], "10000");
        assert_eq!(json["positions"][0]["symbol"], "BTCUSDT");
        assert_eq!(json["orders"].as_array().unwrap().len(), 1);
        assert_eq!(json["pnl"]["trade_count"], 1);
        assert_eq!(json["margin"]["health"], "caution");
        assert_eq!(json["risk"]["portfolio"]["bias"], "long");
        assert!(json["analysis"]["urgent"].is_array());
        assert!(json["analysis"]["recommended"].is_array());
        assert!(json["analysis"]["optional"].is_array());
    }

    #[tokio::test]
    async fn test_api_trades_maps_closed_pnl() {
        let mut mock = MockAccountDataProvider::new();
        mock.expect_get_closed_pnl()
            .withf(|start, limit| start.is_none() && *limit == 50)
            .returning(|_, _| {
                Ok(vec![ClosedPnl {
                    symbol: "ETHUSDT".to_string(),
                    side: "Sell".to_string(),
                    qty: "2".to_string(),
                    avg_exit_price: "2250.5".to_string(),
                    closed_pnl: "-12.5".to_string(),
                    order_id: "o-9".to_string(),
                    updated_time: "1700000000000".to_string(),
                    ..ClosedPnl::default()
                }])
            });

        let (status, json) = get_json(app(mock, &std::env::temp_dir()), "/api/trades").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json[0]["symbol"], "ETHUSDT");
        assert_eq!(json[0]["execTime"], "1700000000000");
        assert_eq!(json[0]["orderId"], "o-9");
    }

    #[tokio::test]
    async fn test_exchange_failure_is_bad_gateway() {
        let mut mock = MockAccountDataProvider::new();
        mock.expect_get_wallet_balance().returning(|| {
            Err(ExchangeError::MissingCredentials).context("Failed to fetch wallet balance")
        });

        let (status, json) = get_json(app(mock, &std::env::temp_dir()), "/api/data").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["ok"], false);
        assert!(json["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to fetch wallet balance"));
    }

    #[tokio::test]
    async fn test_health() {
        let (status, json) = get_json(
            app(MockAccountDataProvider::new(), &std::env::temp_dir()),
            "/api/health",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["ok"], true);
    }

    #[tokio::test]
    async fn test_serves_index_and_assets() {
        let dir = std::env::temp_dir().join(format!("bra-webapp-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("css")).unwrap();
        std::fs::write(dir.join("index.html"), "<h1>dashboard</h1>").unwrap();
        std::fs::write(dir.join("css").join("style.css"), "body{}").unwrap();

        let app = app(MockAccountDataProvider::new(), &dir);

        let resp = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<h1>dashboard</h1>");

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/css/style.css")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
