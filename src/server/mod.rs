pub mod routes;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// JSON API over the valuation engine. When a static directory is
/// configured, non-API paths are served from it with `index.html` as the
/// SPA fallback.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/counters", get(routes::get_counters))
        .route("/api/price", post(routes::price))
        .route("/api/evaluate", post(routes::evaluate))
        .route("/api/curve", post(routes::curve))
        .route("/api/closing-pnl", post(routes::closing_pnl))
        .route("/api/summary", post(routes::summary));

    if let Some(dir) = &state.config.static_dir {
        app = app.fallback_service(
            tower_http::services::ServeDir::new(dir)
                .fallback(tower_http::services::ServeFile::new(dir.join("index.html"))),
        );
    }

    app.layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app() -> Router {
        router(AppState::new(AppConfig::default()))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn call_leg(size: f64, price: f64) -> serde_json::Value {
        serde_json::json!({
            "kind": "call",
            "strike": 100,
            "expiration": "2024-06-28T08:00:00Z",
            "size": size,
            "price": price,
            "implied_volatility": 50.0,
        })
    }

    #[tokio::test]
    async fn test_health() {
        let req = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_evaluate_future() {
        let body = serde_json::json!({
            "legs": [{ "kind": "future", "size": 3, "price": 100 }],
            "price": 110,
            "mode": "theoretical",
        });
        let (status, json) = post_json(app(), "/api/evaluate", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["profit"].as_f64(), Some(30.0));
    }

    #[tokio::test]
    async fn test_closing_pnl_null_vs_value() {
        let body = serde_json::json!({
            "target": call_leg(-1.0, 7.0),
            "candidates": [call_leg(2.0, 5.0), call_leg(2.0, 3.0)],
        });
        let (status, json) = post_json(app(), "/api/closing-pnl", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["closing_pnl"].as_f64(), Some(3.0));

        let body = serde_json::json!({
            "target": call_leg(1.0, 7.0),
            "candidates": [call_leg(2.0, 5.0)],
        });
        let (_, json) = post_json(app(), "/api/closing-pnl", body).await;
        assert!(json["closing_pnl"].is_null());
    }

    #[tokio::test]
    async fn test_curve_points_limit() {
        let body = serde_json::json!({ "legs": [call_leg(1.0, 5.0)], "points": 1_000_000 });
        let (status, json) = post_json(app(), "/api/curve", body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json["error"].as_str().unwrap().contains("exceeds maximum"));
    }

    #[tokio::test]
    async fn test_curve_shape() {
        let body = serde_json::json!({
            "legs": [call_leg(1.0, 5.0)],
            "points": 180,
            "valuation_date": "2024-05-29T08:00:00Z",
        });
        let (status, json) = post_json(app(), "/api/curve", body).await;
        assert_eq!(status, StatusCode::OK);
        let prices = json["prices"].as_array().unwrap();
        assert_eq!(prices.len(), json["expiry_profits"].as_array().unwrap().len());
        assert_eq!(prices.len(), json["theoretical_profits"].as_array().unwrap().len());
        assert_eq!(json["break_evens"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_price_rejects_future() {
        let body = serde_json::json!({
            "kind": "future",
            "underlying": 100,
            "strike": 100,
            "implied_volatility": 50,
            "expiration": "2024-06-28T08:00:00Z",
        });
        let (status, _) = post_json(app(), "/api/price", body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_price_normalizes_fractional_iv() {
        let body = serde_json::json!({
            "kind": "call",
            "underlying": 100,
            "strike": 100,
            "implied_volatility": 0.5,
            "expiration": "2024-03-31T08:00:00Z",
            "valuation_date": "2024-03-01T08:00:00Z",
        });
        let (status, json) = post_json(app(), "/api/price", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["iv_percent"].as_f64(), Some(50.0));
        let price = json["price"].as_f64().unwrap();
        assert!((price - 5.71).abs() < 0.01, "price={price}");
    }

    #[tokio::test]
    async fn test_summary_route() {
        let body = serde_json::json!({
            "legs": [
                { "kind": "future", "size": 2, "price": 90 },
                call_leg(1.0, 5.0),
            ],
            "context": { "underlying_price": 100, "valuation_date": "2024-05-29T08:00:00Z" },
        });
        let (status, json) = post_json(app(), "/api/summary", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["included_legs"].as_u64(), Some(2));
        assert_eq!(json["legs"].as_array().unwrap().len(), 2);
        assert_eq!(json["legs"][0]["pnl"].as_f64(), Some(20.0));
        let delta = json["greeks"]["delta"].as_f64().unwrap();
        assert!(delta > 2.0 && delta < 3.0, "delta={delta}");
    }

    #[tokio::test]
    async fn test_counters_track_requests() {
        let app = app();
        let body = serde_json::json!({
            "legs": [{ "kind": "future", "size": 1, "price": 100 }],
            "price": 105,
            "mode": "expiry",
        });
        post_json(app.clone(), "/api/evaluate", body).await;
        let oversized = serde_json::json!({
            "legs": [{ "kind": "future", "size": 1, "price": 100 }],
            "price": 1e15,
            "mode": "expiry",
        });
        let (status, _) = post_json(app.clone(), "/api/evaluate", oversized).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, json) = get_json(app, "/api/counters").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["evaluations"].as_u64(), Some(1));
        assert_eq!(json["requests_rejected"].as_u64(), Some(1));
        assert_eq!(json["curves_built"].as_u64(), Some(0));
    }

    #[tokio::test]
    async fn test_oversized_inputs_rejected() {
        let body = serde_json::json!({
            "legs": [{ "kind": "future", "size": 1e15, "price": 1e15 }],
            "price": 3e15,
            "mode": "expiry",
        });
        let (status, json) = post_json(app(), "/api/evaluate", body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json["error"].as_str().unwrap().contains("exceeds magnitude"));

        let body = serde_json::json!({ "legs": [], "x_min": 0, "x_max": 1e27 });
        let (status, _) = post_json(app(), "/api/curve", body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let body = serde_json::json!({
            "legs": [call_leg(1.0, 5.0)],
            "context": { "underlying_price": 1e13, "valuation_date": "2024-05-29T08:00:00Z" },
        });
        let (status, _) = post_json(app(), "/api/summary", body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_no_static_dir_is_api_only() {
        let (status, _) = get_json(app(), "/index.html").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_static_dir_served_when_configured() {
        let dir = std::env::temp_dir().join(format!("payoff-static-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("index.html"), "<html>payoff</html>").unwrap();

        let cfg = AppConfig { static_dir: Some(dir.clone()), ..AppConfig::default() };
        let req = Request::builder().uri("/some/page").body(Body::empty()).unwrap();
        let resp = router(AppState::new(cfg)).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"<html>payoff</html>");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
