pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};

use crate::config::ServiceConfig;
use crate::middleware::{guarded, RouteGuard};
use crate::services::{Clock, SessionManager};
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub store: Arc<dyn Store>,
    pub sessions: SessionManager,
    pub clock: Arc<dyn Clock>,
    pub login_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
    pub metrics: Option<PrometheusHandle>,
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    // Login is throttled per IP on top of the global limiter.
    let login_route = Router::new()
        .route("/authentication/login", post(handlers::auth::login))
        .layer(from_fn_with_state(
            state.login_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/authentication/register", post(handlers::auth::register))
        .route("/authentication/logout", post(handlers::auth::logout))
        .merge(login_route);

    // Session bookkeeping routes stay reachable before MFA is verified.
    let session_guard = || RouteGuard::authenticated().allow_partial_mfa();

    let protected_routes = Router::new()
        .route(
            "/authentication/check",
            guarded(get(handlers::auth::check), session_guard()),
        )
        .route(
            "/authentication/mfa/enable",
            guarded(get(handlers::auth::mfa_enable), session_guard()),
        )
        .route(
            "/authentication/mfa/verify",
            guarded(post(handlers::auth::mfa_verify), session_guard()),
        )
        .route(
            "/roles/available-permissions",
            guarded(
                get(handlers::permissions::available_permissions),
                RouteGuard::new(["roles.view"]),
            ),
        )
        .merge(handlers::users::routes())
        .merge(handlers::roles::routes())
        .merge(handlers::organizations::routes())
        .merge(handlers::materials::routes())
        .merge(handlers::products::routes())
        .merge(handlers::collections::routes())
        .merge(handlers::transactions::routes())
        .merge(handlers::bank_details::routes())
        .merge(handlers::notifications::routes())
        .merge(handlers::audit::routes())
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .security
                .allowed_origins
                .iter()
                .filter(|o| o.as_str() != "*")
                .filter_map(|o| match o.parse::<HeaderValue>() {
                    Ok(origin) => Some(origin),
                    Err(e) => {
                        tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                        None
                    }
                })
                .collect::<Vec<HeaderValue>>(),
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::HeaderName::from_static(REQUEST_ID_HEADER)])
        .allow_credentials(true);

    let app = public_routes
        .merge(protected_routes)
        // After routing so the matched route template is available.
        .route_layer(from_fn(metrics_middleware))
        .with_state(state.clone())
        // Global IP rate limiting
        .layer(from_fn_with_state(
            state.ip_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors);

    Ok(app)
}

/// Service health check
pub async fn health_check(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Database health check failed");
        AppError::ServiceUnavailable
    })?;

    state.sessions.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Session store health check failed");
        AppError::ServiceUnavailable
    })?;

    Ok(Json(json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "database": "up",
            "sessions": "up"
        }
    })))
}
