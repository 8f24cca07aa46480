use std::convert::Infallible;
use std::net::SocketAddr;

use axum::async_trait;
use axum::extract::ConnectInfo;
use axum::extract::FromRequestParts;
use http::header;
use http::request::Parts;
use http::Extensions;
use http::HeaderMap;

use crate::domain::audit::models::ClientInfo;

/// Whether `X-Forwarded-For` names the client.
///
/// Installed as a request extension by the router. Only `Trust` when every
/// request arrives through a proxy that overwrites the header, otherwise any
/// caller can pick the address its requests are counted against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ForwardedFor {
    #[default]
    Ignore,
    Trust,
}

impl ForwardedFor {
    pub fn from_trusted(trusted: bool) -> Self {
        if trusted {
            ForwardedFor::Trust
        } else {
            ForwardedFor::Ignore
        }
    }
}

/// Request origin extracted from headers and the peer address.
#[derive(Debug, Clone)]
pub struct ClientMeta(pub ClientInfo);

#[async_trait]
impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientMeta(client_info(&parts.headers, &parts.extensions)))
    }
}

/// Client IP is the socket peer, or the first `X-Forwarded-For` entry when
/// the request carries `ForwardedFor::Trust`.
pub fn client_info(headers: &HeaderMap, extensions: &Extensions) -> ClientInfo {
    let trust = extensions.get::<ForwardedFor>().copied().unwrap_or_default();

    let forwarded = match trust {
        ForwardedFor::Ignore => None,
        ForwardedFor::Trust => headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string),
    };

    let ip = forwarded.or_else(|| {
        extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    });

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    ClientInfo::new(ip, user_agent)
}
