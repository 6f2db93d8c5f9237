use axum::{
    extract::{connect_info::ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use crate::state::AppState;

/// Client address claimed by `X-Forwarded-For` (leftmost entry) or `X-Real-IP`.
pub fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let from_xff = headers
        .get("x-forwarded-for")
        .and_then(|hv| hv.to_str().ok())
        .and_then(|h| h.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());
    from_xff.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|hv| hv.to_str().ok())
            .and_then(|h| h.trim().parse::<IpAddr>().ok())
    })
}

/// Address used as the rate-limit key.
///
/// Proxy headers are client-controlled, so they are read only when
/// `trust_proxy` is set; otherwise the socket address wins. Without either
/// (in-process tests) the key is loopback.
pub fn resolve_client_ip(headers: &HeaderMap, remote: Option<IpAddr>, trust_proxy: bool) -> IpAddr {
    let forwarded = if trust_proxy { forwarded_ip(headers) } else { None };
    forwarded.or(remote).unwrap_or(IpAddr::from([127, 0, 0, 1]))
}

/// Socket address from `ConnectInfo`, when the server was started with it.
pub fn remote_ip(parts: &Parts) -> Option<IpAddr> {
    parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|ConnectInfo(addr)| addr.ip())
}

/// Client IP for per-endpoint limits. Never rejects.
#[derive(Clone, Copy, Debug)]
pub struct ClientIp(pub IpAddr);

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let trust_proxy = state.config.server.trust_proxy;
        Ok(ClientIp(resolve_client_ip(&parts.headers, remote_ip(parts), trust_proxy)))
    }
}
