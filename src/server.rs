//! HTTP server: middleware stack, listener and shutdown.

use std::any::Any;
use std::time::Duration;

use anyhow::Result;
use axum::{Router, body::Body, response::IntoResponse};
use http::{HeaderName, HeaderValue, Method, Request, Response, StatusCode, header};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::api::{ApiResponse, AppState, create_router};
use crate::config::ServerConfig;

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Router plus the outer middleware stack.
///
/// Order, outermost first: request id, tracing, panic recovery, timeout, CORS.
pub fn build_app(state: AppState, config: &ServerConfig) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    create_router(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
            .layer(PropagateRequestIdLayer::new(request_id))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(|req: &Request<_>| {
                        let request_id = req
                            .headers()
                            .get(REQUEST_ID_HEADER)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("")
                            .to_string();
                        tracing::info_span!(
                            "http.request",
                            http.method = %req.method(),
                            http.target = %req.uri(),
                            request_id = %request_id
                        )
                    })
                    .on_response(|res: &Response<_>, latency: Duration, _span: &tracing::Span| {
                        tracing::info!(
                            http.status = res.status().as_u16(),
                            elapsed_ms = latency.as_millis() as u64,
                            "request handled"
                        );
                    }),
            )
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(TimeoutLayer::new(config.request_timeout))
            .layer(cors_layer()),
    )
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        // `*` cannot be combined with credentials
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .expose_headers([header::LINK])
        .allow_credentials(true)
        .max_age(Duration::from_secs(300))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "handler panicked");

    let mut response = ApiResponse::<serde_json::Value>::error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
        None,
    )
    .into_response();
    response.headers_mut().insert(
        header::CONNECTION,
        HeaderValue::from_static("close"),
    );
    response
}

/// Bind and serve until Ctrl+C or SIGTERM, letting in-flight requests finish.
pub async fn serve(state: AppState, config: &ServerConfig) -> Result<()> {
    let app = build_app(state, config);
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(addr = %addr, env = %config.env, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
