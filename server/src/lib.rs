//! EduFund Currency Server
//!
//! HTTP API over the currency service: single and multi-target conversion,
//! receipt conversion for Dirham amounts, the current rate table and a
//! health endpoint.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/convert", post(routes::convert))
        .route("/convert-multiple", post(routes::convert_multiple))
        .route("/convert-mad/:amount", get(routes::convert_mad))
        .route("/rates", get(routes::rates));

    Router::new()
        .route("/health", get(routes::health))
        .nest("/api/currency", api)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use edufund_common::{CurrencyCode, RateTable};
    use edufund_fx::{CurrencyService, CurrencyServiceConfig, MockBehavior, MockRateProvider};
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app_with(provider: MockRateProvider) -> Router {
        let service = CurrencyService::new(Arc::new(provider), CurrencyServiceConfig::default());
        router(AppState::with_service(
            ServerConfig::default(),
            Arc::new(service),
        ))
    }

    fn fallback_app() -> Router {
        app_with(MockRateProvider::failing("mock").unconfigured())
    }

    fn live_app() -> Router {
        let rates = RateTable::from_quotes(vec![
            (CurrencyCode::mad(), dec!(9.5)),
            (CurrencyCode::eur(), dec!(0.95)),
        ])
        .unwrap();
        app_with(MockRateProvider::new("mock", rates))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_convert_defaults_to_mad_usd() {
        let (status, body) = send(
            fallback_app(),
            post_json("/api/currency/convert", json!({ "amount": 100 })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["originalCurrency"], "MAD");
        assert_eq!(body["convertedCurrency"], "USD");
        assert_eq!(body["convertedAmount"], json!(10.0));
        assert_eq!(body["exchangeRate"], json!(0.1));
        assert_eq!(body["source"], "fallback");
    }

    #[tokio::test]
    async fn test_convert_live_rates() {
        let (status, body) = send(
            live_app(),
            post_json(
                "/api/currency/convert",
                json!({ "amount": 95, "from": "mad", "to": "EUR" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["convertedAmount"], json!(9.5));
        assert_eq!(body["source"], "openexchangerates");
    }

    #[tokio::test]
    async fn test_convert_rejects_invalid_code() {
        let (status, body) = send(
            fallback_app(),
            post_json(
                "/api/currency/convert",
                json!({ "amount": 100, "from": "dirham" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "INVALID_CURRENCY_CODE");
    }

    #[tokio::test]
    async fn test_convert_rejects_malformed_body() {
        let (status, body) = send(
            fallback_app(),
            post_json("/api/currency/convert", json!({ "from": "MAD" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_convert_multiple() {
        let (status, body) = send(
            fallback_app(),
            post_json(
                "/api/currency/convert-multiple",
                json!({ "amount": 1000, "targets": ["USD", "EUR"] }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["from"], "MAD");
        assert_eq!(body["conversions"]["USD"]["convertedAmount"], json!(100.0));
        assert_eq!(body["conversions"]["EUR"]["convertedAmount"], json!(92.0));
        assert_eq!(body["conversions"]["EUR"]["originalCurrency"], "MAD");
    }

    #[tokio::test]
    async fn test_convert_mad_receipt() {
        let (status, body) = send(fallback_app(), get("/api/currency/convert-mad/1500.5")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["MAD"], json!(1500.5));
        assert_eq!(body["USD"], json!(150.05));
        assert_eq!(body["EUR"], json!(138.05));
        assert_eq!(body["formatted"]["long"], "1.500,5 MAD");
        assert_eq!(body["formatted"]["short"], "1.500,5 DH");
        assert_eq!(body["rates"]["MAD_USD"], json!(0.1));
        assert_eq!(body["rates"]["MAD_EUR"], json!(0.092));
        assert_eq!(body["source"], "fallback");
    }

    #[tokio::test]
    async fn test_convert_mad_rejects_non_numeric() {
        let (status, body) = send(fallback_app(), get("/api/currency/convert-mad/abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_rates_listing() {
        let (status, body) = send(live_app(), get("/api/currency/rates")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["base"], "USD");
        assert_eq!(body["rates"]["USD"], json!(1.0));
        assert_eq!(body["rates"]["MAD"], json!(9.5));
        assert_eq!(body["source"], "openexchangerates");
    }

    #[tokio::test]
    async fn test_request_build_failure_is_server_error() {
        let app = app_with(MockRateProvider::with_behavior(
            "mock",
            MockBehavior::RequestBuild,
        ));
        let (status, body) = send(app, get("/api/currency/rates")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "REQUEST_BUILD_FAILED");
    }

    #[tokio::test]
    async fn test_health() {
        let app = fallback_app();
        let (_, _) = send(
            app.clone(),
            post_json("/api/currency/convert", json!({ "amount": 1 })),
        )
        .await;
        let (status, body) = send(app, get("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["provider"], "mock");
        assert_eq!(body["rates"]["cache_ttl_secs"], 3600);
        assert_eq!(body["rates"]["coalesce_refreshes"], false);
        assert_eq!(body["rates"]["live_rates_configured"], false);
        assert_eq!(body["stats"]["conversions"], 1);
        assert_eq!(body["stats"]["fallbacks_served"], 1);
    }
}
