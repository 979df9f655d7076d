use std::sync::Arc;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post, put},
    Router,
};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::{
    error::{AppError, Result},
    handlers,
    middleware_layer::auth::{require_admin, require_auth},
    state::AppState,
};

/// Builds the application router.
///
/// Register and login are rate limited per peer IP, so the server must be
/// started with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn router(state: AppState) -> Result<Router> {
    let credential_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(2)
            .burst_size(10)
            .finish()
            .ok_or_else(|| AppError::Internal("Invalid rate limit configuration".to_string()))?,
    );

    let credential_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .layer(GovernorLayer::new(credential_governor_conf))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/auth/profile", patch(handlers::auth::update_profile))
        .route(
            "/api/auth/change-password",
            post(handlers::auth::change_password),
        )
        .route(
            "/api/auth/sessions/revoke",
            post(handlers::auth::revoke_own_sessions),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route(
            "/api/admin/users/{user_id}/role",
            put(handlers::auth::set_user_role),
        )
        .route(
            "/api/admin/users/{user_id}/sessions/revoke",
            post(handlers::auth::revoke_user_sessions),
        )
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(credential_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        );

    Ok(app)
}
