use std::sync::Arc;
use std::time::Duration;

use auth::TokenSigner;
use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::patch;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::change_password::change_password;
use super::handlers::channel_profile::channel_profile;
use super::handlers::current_user::current_user;
use super::handlers::login::login;
use super::handlers::logout::logout;
use super::handlers::refresh_session::refresh_session;
use super::handlers::register::register;
use super::handlers::update_account::update_account;
use super::handlers::update_avatar::update_avatar;
use super::handlers::update_cover_image::update_cover_image;
use super::middleware::authenticate as auth_middleware;
use crate::domain::user::service::AccountService;
use crate::outbound::media::HttpMediaStore;
use crate::outbound::repositories::user::PostgresUserRepository;

#[derive(Clone)]
pub struct AppState {
    pub account_service: Arc<AccountService<PostgresUserRepository, HttpMediaStore>>,
    pub token_signer: Arc<TokenSigner>,
}

pub fn create_router(
    account_service: Arc<AccountService<PostgresUserRepository, HttpMediaStore>>,
    token_signer: Arc<TokenSigner>,
) -> Router {
    let state = AppState {
        account_service,
        token_signer,
    };

    let public_routes = Router::new()
        .route("/api/users/register", post(register))
        .route("/api/users/login", post(login))
        .route("/api/users/refresh-token", post(refresh_session));

    let protected_routes = Router::new()
        .route("/api/users/logout", post(logout))
        .route("/api/users/change-password", post(change_password))
        .route("/api/users/current-user", get(current_user))
        .route("/api/users/update-account", patch(update_account))
        .route("/api/users/avatar", patch(update_avatar))
        .route("/api/users/cover-image", patch(update_cover_image))
        .route("/api/users/channel/:username", get(channel_profile))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
