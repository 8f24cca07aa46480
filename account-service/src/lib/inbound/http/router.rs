use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use axum::Extension;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::client::ForwardedFor;
use super::handlers::admin;
use super::handlers::availability::check_email;
use super::handlers::availability::check_username;
use super::handlers::change_password::change_password;
use super::handlers::login::login;
use super::handlers::logout::logout;
use super::handlers::logout::revoke_session;
use super::handlers::profile::profile;
use super::handlers::refresh::refresh_token;
use super::handlers::register::register;
use super::handlers::sessions::list_sessions;
use super::middleware::authenticate as auth_middleware;
use super::middleware::require_admin;
use super::rate_limit::rate_limit;
use super::rate_limit::RateLimitState;
use crate::domain::account::ports::AccountServicePort;
use crate::domain::audit::ports::AuditServicePort;
use crate::domain::auth::ports::AuthServicePort;
use crate::domain::rate_limit::models::RatePolicy;
use crate::domain::rate_limit::ports::RateGuardPort;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthServicePort>,
    pub account_service: Arc<dyn AccountServicePort>,
    pub audit_service: Arc<dyn AuditServicePort>,
    pub rate_guard: Arc<dyn RateGuardPort>,
    pub retention: LogRetention,
}

/// Rate policies for the credential-accepting endpoints.
#[derive(Debug, Clone, Copy)]
pub struct RateLimits {
    pub login: RatePolicy,
    pub register: RatePolicy,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            login: RatePolicy::login(),
            register: RatePolicy::register(),
        }
    }
}

/// Default retention for the admin log cleanup endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRetention {
    pub audit_log: chrono::Duration,
    pub rate_limit_log: chrono::Duration,
}

impl Default for LogRetention {
    fn default() -> Self {
        Self {
            audit_log: chrono::Duration::days(90),
            rate_limit_log: chrono::Duration::days(30),
        }
    }
}

/// Deployment knobs of the HTTP edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouterSettings {
    pub rate_limits: RateLimits,
    pub retention: LogRetention,
    pub forwarded_for: ForwardedFor,
}

pub fn create_router(
    auth_service: Arc<dyn AuthServicePort>,
    account_service: Arc<dyn AccountServicePort>,
    audit_service: Arc<dyn AuditServicePort>,
    rate_guard: Arc<dyn RateGuardPort>,
    settings: RouterSettings,
) -> Router {
    let state = AppState {
        auth_service,
        account_service,
        audit_service,
        rate_guard: Arc::clone(&rate_guard),
        retention: settings.retention,
    };

    let login_routes = Router::new()
        .route("/login", post(login))
        .route_layer(middleware::from_fn_with_state(
            RateLimitState::new(Arc::clone(&rate_guard), settings.rate_limits.login),
            rate_limit,
        ));

    let register_routes = Router::new()
        .route("/register", post(register))
        .route_layer(middleware::from_fn_with_state(
            RateLimitState::new(rate_guard, settings.rate_limits.register),
            rate_limit,
        ));

    let public_routes = Router::new()
        .route("/refresh-token", post(refresh_token))
        .route("/check-username/:username", get(check_username))
        .route("/check-email/:email", get(check_email));

    let protected_routes = Router::new()
        .route("/profile", get(profile))
        .route("/change-password", put(change_password))
        .route("/sessions", get(list_sessions))
        .route("/sessions/:session_id", delete(revoke_session))
        .route("/logout", post(logout))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Layers run bottom-up: authenticate first, then the role check.
    let admin_routes = Router::new()
        .route(
            "/admin/users/:user_id/sessions",
            get(admin::list_user_sessions).delete(admin::revoke_all_user_sessions),
        )
        .route(
            "/admin/users/:user_id/sessions/:session_id",
            delete(admin::revoke_user_session),
        )
        .route("/admin/users/:user_id/ban", put(admin::ban_user))
        .route("/admin/users/:user_id/unban", put(admin::unban_user))
        .route("/admin/users/:user_id/deactivate", put(admin::deactivate_user))
        .route("/admin/users/:user_id/reactivate", put(admin::reactivate_user))
        .route(
            "/admin/users/:user_id/reset-password",
            put(admin::reset_password),
        )
        .route("/admin/audit-logs", get(admin::list_audit_logs))
        .route("/admin/cleanup/sessions", post(admin::cleanup_sessions))
        .route("/admin/cleanup/audit-logs", post(admin::cleanup_audit_logs))
        .route(
            "/admin/cleanup/rate-limit-logs",
            post(admin::cleanup_rate_limit_logs),
        )
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Routes carry session ids, so only the route template is logged
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                route = route_template(request),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                route = route_template(request),
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

    let api = Router::new()
        .merge(login_routes)
        .merge(register_routes)
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes);

    Router::new()
        .nest("/api/auth", api)
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .layer(Extension(settings.forwarded_for))
        .with_state(state)
}

/// Matched route pattern, e.g. `/api/auth/sessions/:session_id`.
fn route_template<B>(request: &Request<B>) -> &str {
    request
        .extensions()
        .get::<MatchedPath>()
        .map_or("unmatched", MatchedPath::as_str)
}

#[cfg(test)]
mod tests {
    use axum::extract::Request as AxumRequest;
    use axum::http::HeaderValue;
    use axum::http::StatusCode;
    use axum::middleware::Next;
    use axum::response::Response as AxumResponse;
    use tower::ServiceExt;

    use super::*;

    async fn echo_route(request: AxumRequest, next: Next) -> AxumResponse {
        let route = route_template(&request).to_string();
        let mut response = next.run(request).await;
        if let Ok(value) = HeaderValue::from_str(&route) {
            response.headers_mut().insert("x-route", value);
        }
        response
    }

    #[tokio::test]
    async fn test_route_template_hides_path_parameters() {
        let app = Router::new()
            .nest(
                "/api/auth",
                Router::new().route("/sessions/:session_id", delete(|| async { StatusCode::OK })),
            )
            .layer(middleware::from_fn(echo_route));

        let response = app
            .oneshot(
                http::Request::builder()
                    .method("DELETE")
                    .uri("/api/auth/sessions/2f1c9a7e-secret-session-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("x-route").unwrap(),
            "/api/auth/sessions/:session_id"
        );
    }
}
