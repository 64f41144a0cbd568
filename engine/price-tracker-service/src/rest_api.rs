//! REST API endpoints
//!
//! - `POST /api/v1/currency/add` `{symbol}`
//! - `POST /api/v1/currency/remove` `{symbol}`
//! - `POST /api/v1/currency/price` `{symbol, timestamp}` -> `{price}`
//! - `GET /api/v1/currency`
//! - `GET /api/v1/metrics`
//! - `GET /healthz`
//!
//! Failures are rendered as `{error: {code, message}, timestamp}`.

use chrono::{DateTime, Utc};
use price_tracker::TrackingError;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::error;
use warp::http::StatusCode;
use warp::Filter;

use crate::service::ServiceState;

const MAX_BODY_BYTES: u64 = 16 * 1024;

/// Tracking flow failure carried through warp's rejection chain
#[derive(Debug)]
struct ApiError(TrackingError);

impl warp::reject::Reject for ApiError {}

fn reject(err: TrackingError) -> warp::Rejection {
    warp::reject::custom(ApiError(err))
}

#[derive(Debug, Deserialize)]
pub struct SymbolRequest {
    pub symbol: String,
}

#[derive(Debug, Deserialize)]
pub struct PriceRequest {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PriceResponse {
    pub price: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemoveResponse {
    pub symbol: String,
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub timestamp: String,
}

/// HTTP status of a tracking flow error
pub fn status_for(err: &TrackingError) -> StatusCode {
    match err {
        TrackingError::InvalidSymbol(_) | TrackingError::AlreadyExists => StatusCode::BAD_REQUEST,
        e if e.is_not_found() => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn add_currency(
    request: SymbolRequest,
    state: Arc<ServiceState>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let coin = state.tracking.add(&request.symbol).await.map_err(reject)?;
    Ok(warp::reply::json(&coin))
}

pub async fn remove_currency(
    request: SymbolRequest,
    state: Arc<ServiceState>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let status = state.tracking.remove(&request.symbol).await.map_err(reject)?;

    Ok(warp::reply::json(&RemoveResponse {
        symbol: status.coin.symbol,
        is_active: status.is_active,
    }))
}

pub async fn get_price(
    request: PriceRequest,
    state: Arc<ServiceState>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let point = state.tracking.price(&request.symbol, request.timestamp).await.map_err(reject)?;
    Ok(warp::reply::json(&PriceResponse { price: point.price }))
}

pub async fn list_currencies(state: Arc<ServiceState>) -> Result<impl warp::Reply, warp::Rejection> {
    let coins = state.tracking.list().await.map_err(reject)?;
    Ok(warp::reply::json(&coins))
}

pub async fn get_metrics(state: Arc<ServiceState>) -> Result<impl warp::Reply, Infallible> {
    Ok(warp::reply::json(&state.engine.metrics().snapshot()))
}

pub async fn health(state: Arc<ServiceState>) -> Result<impl warp::Reply, Infallible> {
    let health = state.health().await;
    let status =
        if health.status == "healthy" { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    Ok(warp::reply::with_status(warp::reply::json(&health), status))
}

/// Render every rejection as the JSON error envelope
pub async fn handle_rejection(err: warp::Rejection) -> Result<impl warp::Reply, Infallible> {
    let (status, message) = if let Some(ApiError(e)) = err.find::<ApiError>() {
        let status = status_for(e);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", e);
            (status, "Internal server error".to_string())
        } else {
            (status, e.to_string())
        }
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(e) = err.find::<warp::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        error!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    };

    let body = ErrorResponse {
        error: ErrorBody { code: status.as_u16(), message },
        timestamp: Utc::now().to_rfc3339(),
    };
    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}

fn with_state(
    state: Arc<ServiceState>,
) -> impl Filter<Extract = (Arc<ServiceState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
where
    T: for<'de> Deserialize<'de> + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

/// Create all routes
pub fn create_routes(
    state: Arc<ServiceState>,
) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
    let currency = warp::path("api").and(warp::path("v1")).and(warp::path("currency"));

    let add = currency
        .and(warp::path("add"))
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body::<SymbolRequest>())
        .and(with_state(state.clone()))
        .and_then(add_currency);

    let remove = currency
        .and(warp::path("remove"))
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body::<SymbolRequest>())
        .and(with_state(state.clone()))
        .and_then(remove_currency);

    let price = currency
        .and(warp::path("price"))
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body::<PriceRequest>())
        .and(with_state(state.clone()))
        .and_then(get_price);

    let list = currency
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(list_currencies);

    let metrics = warp::path("api")
        .and(warp::path("v1"))
        .and(warp::path("metrics"))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_metrics);

    let healthz = warp::path("healthz")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state))
        .and_then(health);

    add.or(remove)
        .or(price)
        .or(list)
        .or(metrics)
        .or(healthz)
        .with(
            warp::cors()
                .allow_any_origin()
                .allow_headers(vec!["content-type"])
                .allow_methods(vec!["GET", "POST", "OPTIONS"]),
        )
        .recover(handle_rejection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::testing::StaticPriceSource;
    use price_tracker::NewPricePoint;
    use serde_json::{json, Value};

    fn state() -> Arc<ServiceState> {
        let mut config = ServiceConfig::default();
        config.service.in_memory = true;
        let prices = StaticPriceSource::new(&[("BTC", 64_000.0), ("ETH", 3_100.0)]);
        Arc::new(ServiceState::in_memory(config, Arc::new(prices)).unwrap())
    }

    fn body_json(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn test_add_list_remove() {
        let state = state();
        let routes = create_routes(state.clone());

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/currency/add")
            .json(&json!({"symbol": "btc"}))
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp.body())["symbol"], "BTC");
        assert!(state.engine.registry().contains("BTC"));

        let resp = warp::test::request().method("GET").path("/api/v1/currency").reply(&routes).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let list = body_json(resp.body());
        assert_eq!(list[0]["symbol"], "BTC");
        assert_eq!(list[0]["is_active"], true);

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/currency/remove")
            .json(&json!({"symbol": " btc "}))
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp.body());
        assert_eq!(body["symbol"], "BTC");
        assert_eq!(body["is_active"], false);
        assert!(!state.engine.registry().contains("BTC"));
    }

    #[tokio::test]
    async fn test_add_unknown_symbol_is_404() {
        let routes = create_routes(state());

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/currency/add")
            .json(&json!({"symbol": "NOPE"}))
            .reply(&routes)
            .await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = body_json(resp.body());
        assert_eq!(body["error"]["code"], 404);
        assert_eq!(body["error"]["message"], "symbol not found");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_invalid_symbol_and_bad_body_are_400() {
        let routes = create_routes(state());

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/currency/add")
            .json(&json!({"symbol": "BTC/USDT"}))
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/currency/add")
            .header("content-type", "application/json")
            .body("{\"sym\":")
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp.body())["error"]["code"], 400);
    }

    #[tokio::test]
    async fn test_price_lookup() {
        let state = state();
        let routes = create_routes(state.clone());
        let coin = state.tracking.add("ETH").await.unwrap();

        let at: DateTime<Utc> = "2024-01-01T00:00:10Z".parse().unwrap();
        state.history.append(NewPricePoint::new(coin.id, 3_000.0, at)).await.unwrap();

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/currency/price")
            .json(&json!({"symbol": "eth", "timestamp": "2024-01-01T00:00:12Z"}))
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp.body())["price"], 3_000.0);

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/currency/price")
            .json(&json!({"symbol": "BTC", "timestamp": "2024-01-01T00:00:12Z"}))
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_price_without_history_is_404() {
        let state = state();
        let routes = create_routes(state.clone());
        state.tracking.add("BTC").await.unwrap();

        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/currency/price")
            .json(&json!({"symbol": "BTC", "timestamp": "2024-01-01T00:00:00Z"}))
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp.body())["error"]["message"], "history not found");
    }

    #[tokio::test]
    async fn test_health_and_metrics() {
        let state = state();
        let routes = create_routes(state.clone());

        let resp = warp::test::request().method("GET").path("/healthz").reply(&routes).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.start_engine().await.unwrap();
        let resp = warp::test::request().method("GET").path("/healthz").reply(&routes).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp.body())["engine"], "running");

        let resp = warp::test::request().method("GET").path("/api/v1/metrics").reply(&routes).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp.body())["tracked_coins"], 0);

        state.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let routes = create_routes(state());
        let resp = warp::test::request().method("GET").path("/api/v2/nothing").reply(&routes).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&TrackingError::AlreadyExists), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&TrackingError::TrackingNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&TrackingError::CoinNotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&TrackingError::PriceSource(price_tracker::PriceSourceError::unexpected("x"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
