//! Axum router configuration with middleware.
//!
//! Routes:
//! - `GET /ws` WebSocket ingress
//! - `GET /getMessages` and `GET /api/v1/messages` message history
//! - `GET /health` liveness plus live connection count
//!
//! Middleware: CORS on every route, tracing.

use axum::extract::State;
use axum::http::{header, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let api_routes = Router::new().route("/messages", get(handlers::messages::list_messages));

    Router::new()
        .route("/ws", get(handlers::ws::ws_handler))
        .route("/getMessages", get(handlers::messages::list_messages))
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Liveness check with the number of live connections.
async fn health_check(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "connections": state.hub.connection_count(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use relay_core::store::MessageStore;
    use relay_types::message::Message;
    use tower::ServiceExt;

    use super::*;
    use crate::state::testing::test_app;

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_connections() {
        let app = test_app().await;
        let (status, json) = get_json(build_router(app.state.clone()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["connections"], 0);
    }

    #[tokio::test]
    async fn test_empty_history_is_empty_array() {
        let app = test_app().await;
        let (status, json) = get_json(build_router(app.state.clone()), "/getMessages").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_history_lists_saved_messages_in_order() {
        let app = test_app().await;
        for content in ["first", "second"] {
            let msg = Message {
                timestamp: "2026-01-01T00:00:00.000Z".to_string(),
                ..Message::new("text", content, "u1")
            };
            app.state.store.save(&msg).await.unwrap();
        }

        for uri in ["/getMessages", "/api/v1/messages"] {
            let (status, json) = get_json(build_router(app.state.clone()), uri).await;
            assert_eq!(status, StatusCode::OK);
            let messages: Vec<Message> = serde_json::from_value(json).unwrap();
            let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
            assert_eq!(contents, ["first", "second"]);
            assert!(messages.iter().all(|m| m.id.is_some()));
        }
    }

    #[tokio::test]
    async fn test_history_wire_field_names() {
        let app = test_app().await;
        app.state
            .store
            .save(&Message::new("text", "hi", "u1"))
            .await
            .unwrap();

        let (_, json) = get_json(build_router(app.state.clone()), "/getMessages").await;
        let record = &json[0];
        assert_eq!(record["type"], "text");
        assert_eq!(record["senderId"], "u1");
        assert!(record.get("id").is_some());
        assert!(record.get("timestamp").is_some());
    }

    #[tokio::test]
    async fn test_store_failure_returns_500() {
        let app = test_app().await;
        sqlx::query("DROP TABLE messages")
            .execute(&app.pool.writer)
            .await
            .unwrap();

        let (status, json) = get_json(build_router(app.state.clone()), "/getMessages").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["code"], "STORE_ERROR");
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let app = test_app().await;
        let response = build_router(app.state.clone())
            .oneshot(
                Request::builder()
                    .uri("/getMessages")
                    .header(header::ORIGIN, "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let app = test_app().await;
        let response = build_router(app.state.clone())
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/getMessages")
                    .header(header::ORIGIN, "http://example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_success());
        let methods = response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(methods.contains("GET"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = test_app().await;
        let response = build_router(app.state.clone())
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
