use std::sync::Arc;

use axum::extract::OriginalUri;
use axum::extract::Request;
use axum::extract::State;
use axum::http::HeaderName;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use chrono::Utc;

use crate::domain::auth::models::Identity;
use crate::domain::rate_limit::models::RateDecision;
use crate::domain::rate_limit::models::RateKey;
use crate::domain::rate_limit::models::RatePolicy;
use crate::domain::rate_limit::models::RequestRecord;
use crate::domain::rate_limit::ports::RateGuardPort;
use crate::inbound::http::client::client_info;
use crate::inbound::http::handlers::ApiError;

const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Per-route limiter state: shared guard plus the route's policy.
#[derive(Clone)]
pub struct RateLimitState {
    pub guard: Arc<dyn RateGuardPort>,
    pub policy: RatePolicy,
}

impl RateLimitState {
    pub fn new(guard: Arc<dyn RateGuardPort>, policy: RatePolicy) -> Self {
        Self { guard, policy }
    }
}

/// Middleware that counts requests per (client IP, user, path).
pub async fn rate_limit(
    State(limiter): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let client = client_info(req.headers(), req.extensions());
    let key = RateKey {
        ip_address: client.ip.unwrap_or_else(|| "unknown".to_string()),
        user_id: req.extensions().get::<Identity>().map(|identity| identity.user_id),
        endpoint: req
            .extensions()
            .get::<OriginalUri>()
            .map_or_else(|| req.uri().path(), |OriginalUri(uri)| uri.path())
            .to_string(),
    };
    let method = req.method().to_string();

    match limiter.guard.check(&key, limiter.policy).await {
        RateDecision::Limited {
            limit,
            retry_after_secs,
        } => {
            limiter
                .guard
                .record(RequestRecord {
                    key,
                    method,
                    status_code: 429,
                    user_agent: client.user_agent,
                    created_at: Utc::now(),
                })
                .await;

            let mut response = ApiError::TooManyRequests {
                message: "Too many requests, please try again later".to_string(),
                retry_after: retry_after_secs,
            }
            .into_response();

            let headers = response.headers_mut();
            headers.insert(LIMIT_HEADER, HeaderValue::from(limit));
            headers.insert(REMAINING_HEADER, HeaderValue::from(0u32));
            headers.insert(
                RESET_HEADER,
                HeaderValue::from((Utc::now().timestamp() + retry_after_secs).max(0)),
            );
            headers.insert(
                axum::http::header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs.max(0)),
            );
            response
        }
        RateDecision::Allowed {
            limit,
            remaining,
            reset_at,
        } => {
            let mut response = next.run(req).await;

            limiter
                .guard
                .record(RequestRecord {
                    key,
                    method,
                    status_code: response.status().as_u16(),
                    user_agent: client.user_agent,
                    created_at: Utc::now(),
                })
                .await;

            let headers = response.headers_mut();
            headers.insert(LIMIT_HEADER, HeaderValue::from(limit));
            headers.insert(REMAINING_HEADER, HeaderValue::from(remaining));
            headers.insert(RESET_HEADER, HeaderValue::from(reset_at.timestamp()));
            response
        }
    }
}
