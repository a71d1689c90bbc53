mod routes;
mod types;

use crate::bot::BotManager;
use crate::config::HTTPConfig;
use crate::http::routes::*;
use crate::http::types::HttpError;
use crate::TracingReloadHandle;
use anyhow::{bail, Result};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::log::{debug, warn};

#[cfg(feature = "sentry")]
use sentry::integrations::tower::{NewSentryLayer, SentryHttpLayer};

#[derive(Clone)]
pub struct HttpState {
    pub bot_manager: BotManager,
    pub channel_secret: String,
    pub tracing_reload: TracingReloadHandle,
}

async fn auth_middleware(
    axum::extract::State(expected_token): axum::extract::State<String>,
    headers: axum::http::HeaderMap,
    request: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<axum::response::Response, HttpError> {
    let auth_header = headers.get("authorization").ok_or(HttpError {
        status: StatusCode::UNAUTHORIZED,
        message: "Missing authorization header".to_string(),
    })?;

    let auth_str = auth_header.to_str().map_err(|_| HttpError {
        status: StatusCode::BAD_REQUEST,
        message: "Invalid authorization header".to_string(),
    })?;

    let token = auth_str.strip_prefix("Bearer ").unwrap_or(auth_str).trim();
    if token != expected_token {
        return Err(HttpError {
            status: StatusCode::UNAUTHORIZED,
            message: "Invalid token".to_string(),
        });
    }

    Ok(next.run(request).await)
}

pub fn create_app(
    config: HTTPConfig,
    channel_secret: String,
    bot_manager: BotManager,
    _sentry: bool,
    _tracing_reload: TracingReloadHandle,
) -> Result<axum::Router> {
    // Operational routes. The webhook cannot sit behind bearer auth since
    // LINE authenticates with its body signature instead.
    let mut sys_router = axum::Router::new()
        .route("/sys/version", get(sys_version))
        .route("/sys/set-log-level", post(sys_set_log_level));

    if config.require_authentication {
        match std::env::var("FOODBOT_HTTP_AUTH_TOKEN") {
            Ok(token) => {
                debug!("Adding HTTP authentication middleware to /sys routes!");
                sys_router = sys_router.layer(
                    axum::middleware::from_fn_with_state(token, auth_middleware)
                );
            },
            Err(_) => bail!("Missing required FOODBOT_HTTP_AUTH_TOKEN environment variable, and require_authentication is enabled!")
        }
    } else {
        warn!("Serving /sys routes without authentication middleware, as require_authentication is disabled!");
    }

    #[allow(unused_mut)]
    let mut router = axum::Router::new()
        .route("/callback", post(line_callback))
        .merge(sys_router)
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-version"),
            HeaderValue::from_static(crate::VERSION),
        ))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()));

    // If Sentry is enabled, include axum integration layers.
    #[cfg(feature = "sentry")]
    if _sentry {
        debug!("Adding Sentry HTTP layer!");
        router = router
            .layer(
                ServiceBuilder::new()
                    .layer(NewSentryLayer::<axum::http::Request<axum::body::Body>>::new_from_top()),
            )
            .layer(ServiceBuilder::new().layer(SentryHttpLayer::new().enable_transaction()))
    }

    let state = HttpState {
        bot_manager,
        channel_secret,
        tracing_reload: _tracing_reload,
    };
    Ok(router.with_state(state))
}

#[cfg(test)]
mod callback_tests {
    use super::*;
    use crate::config::LineConfig;
    use crate::line::{self, LineClient};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;
    use tracing_subscriber::{reload, EnvFilter};

    const CHANNEL_SECRET: &str = "test-channel-secret";

    fn test_app() -> axum::Router {
        let line_client = LineClient::new(&LineConfig::default()).expect("client should build");
        let bot_manager = BotManager::new(line_client, None);
        let (_, reload_handle) = reload::Layer::<EnvFilter, _>::new(EnvFilter::new("info"));

        let config = HTTPConfig {
            require_authentication: false,
            ..HTTPConfig::default()
        };
        create_app(
            config,
            CHANNEL_SECRET.to_string(),
            bot_manager,
            false,
            reload_handle,
        )
        .expect("router should build")
    }

    fn callback_request(body: &'static str, signature: Option<String>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/callback")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header(line::SIGNATURE_HEADER, signature);
        }
        builder.body(Body::from(body)).expect("request should build")
    }

    #[tokio::test]
    async fn test_missing_signature_is_rejected() {
        let response = test_app()
            .oneshot(callback_request(r#"{"events":[]}"#, None))
            .await
            .expect("request should complete");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_wrong_signature_is_rejected() {
        let body = r#"{"events":[]}"#;
        let signature = line::sign("some-other-secret", body.as_bytes());

        let response = test_app()
            .oneshot(callback_request(body, Some(signature)))
            .await
            .expect("request should complete");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_valid_signature_is_acknowledged() {
        // A follow event is handled entirely locally, so the delivery gets
        // its 200 "OK" without any outbound call.
        let body = r#"{"events":[{"type":"follow","source":{"type":"user","userId":"U1"}}]}"#;
        let signature = line::sign(CHANNEL_SECRET, body.as_bytes());

        let response = test_app()
            .oneshot(callback_request(body, Some(signature)))
            .await
            .expect("request should complete");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .expect("body should collect");
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn test_valid_signature_with_garbage_body_is_bad_request() {
        let body = "not json";
        let signature = line::sign(CHANNEL_SECRET, body.as_bytes());

        let response = test_app()
            .oneshot(callback_request(body, Some(signature)))
            .await
            .expect("request should complete");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sys_version_reports_build_version() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/sys/version")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should complete");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("x-version")
                .and_then(|value| value.to_str().ok()),
            Some(crate::VERSION)
        );
    }
}
