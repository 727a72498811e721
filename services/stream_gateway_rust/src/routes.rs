//! HTTP routes: `GET /stream/:league` (SSE) and `GET /health`.

use axum::{extract::State, routing::get, Json, Router};
use linecast_core::{HubRegistry, HubStatus};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};

use crate::sse::stream_league;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<HubRegistry>,
    pub bridge_buffer: usize,
    pub sse_keepalive: Duration,
    /// Flips to true once the gateway starts shutting down
    pub shutdown: watch::Receiver<bool>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub hubs: Vec<HubStatus>,
}

pub fn create_router(state: AppState) -> Router {
    // Browser clients connect from other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/stream/:league", get(stream_league))
        .route("/health", get(health))
        .with_state(state)
        .layer(cors)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        hubs: state.registry.status(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use futures_util::StreamExt;
    use linecast_core::{GameSource, GameState, GameStatus, HubConfig, League};
    use tower::ServiceExt;

    struct FixedSource;

    #[async_trait]
    impl GameSource for FixedSource {
        async fn fetch_games(&self, league: League) -> Result<Vec<GameState>> {
            let mut game = GameState::new("401", league, GameStatus::Live);
            game.home_score = 14;
            game.away_score = 10;
            Ok(vec![game])
        }

        fn source_name(&self) -> &str {
            "fixed"
        }
    }

    fn app() -> (Router, Arc<HubRegistry>) {
        let registry = Arc::new(HubRegistry::new(Arc::new(FixedSource), HubConfig::default()));
        let router = create_router(AppState {
            registry: registry.clone(),
            bridge_buffer: 8,
            sse_keepalive: Duration::from_secs(15),
            shutdown: watch::channel(false).1,
        });
        (router, registry)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("failed to build request")
    }

    #[tokio::test]
    async fn test_health_lists_hubs() {
        let (app, registry) = app();
        registry.get_or_create(League::NFL);

        let response = app.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["hubs"][0]["league"], "nfl");
        assert_eq!(body["hubs"][0]["active"], false);
    }

    #[tokio::test]
    async fn test_unknown_league_is_not_found() {
        let (app, registry) = app();
        let response = app.oneshot(get_request("/stream/mlb")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(registry.hub_count(), 0);
    }

    #[tokio::test]
    async fn test_stream_sends_update_event_and_releases_on_disconnect() {
        let (app, registry) = app();
        let response = app.oneshot(get_request("/stream/nfl")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"].to_str().unwrap(),
            "text/event-stream"
        );

        let mut body = response.into_body().into_data_stream();
        let chunk = body.next().await.unwrap().unwrap();
        let text = String::from_utf8_lossy(&chunk);
        assert!(text.contains("event: update"));
        assert!(text.contains("\"gameId\":\"401\""));

        let hub = registry.get(League::NFL).unwrap();
        assert_eq!(hub.subscriber_count(), 1);

        drop(body);
        assert_eq!(hub.subscriber_count(), 0);
        assert!(!hub.is_active());
    }
}
