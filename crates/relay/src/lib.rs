// donelist-relay: reference todo mutation service over HTTP.

pub mod api;
pub mod auth;
pub mod config;
pub mod cors;
pub mod error;
pub mod store;
pub mod validation;

use std::{sync::Arc, time::Instant};

use anyhow::Context;
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::{
    auth::jwt::JwtAccessTokenService,
    config::RelayConfig,
    error::{attach_request_id_header, request_id_from_headers_or_generate, with_request_id_scope},
    store::TodoStore,
    validation::MAX_REST_BODY_BYTES,
};

pub fn build_router(
    store: TodoStore,
    jwt_service: Arc<JwtAccessTokenService>,
    cors_origins: Option<&str>,
) -> Router {
    let router = Router::new()
        .route("/healthz", get(healthz))
        .merge(api::router(store, jwt_service))
        .layer(DefaultBodyLimit::max(MAX_REST_BODY_BYTES));
    let router = match cors_origins {
        Some(origins) => router.layer(cors::cors_layer(origins)),
        None => router,
    };
    router
        .layer(middleware::from_fn(request_context_middleware))
        .layer(middleware::from_fn(panic_handler))
}

/// Serve the relay on an already-bound listener until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    config: &RelayConfig,
    store: TodoStore,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let jwt_service =
        Arc::new(JwtAccessTokenService::new(&config.jwt_secret).context("invalid relay JWT secret")?);
    let app = build_router(store, jwt_service, config.cors_origins.as_deref());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("relay server exited unexpectedly")
}

async fn healthz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

async fn panic_handler(request: Request<Body>, next: Next) -> Response {
    match tokio::spawn(async move { next.run(request).await }).await {
        Ok(response) => response,
        Err(join_error) => {
            error!(?join_error, "request handling panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn request_context_middleware(request: Request<Body>, next: Next) -> Response {
    let request_id = request_id_from_headers_or_generate(request.headers());

    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started_at = Instant::now();

    let mut response = with_request_id_scope(request_id.clone(), next.run(request)).await;
    attach_request_id_header(&mut response, &request_id);

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started_at.elapsed().as_millis() as u64,
        "request completed"
    );

    response
}
