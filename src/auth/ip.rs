//! Client IP extraction utilities.

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;

/// Header consulted when the server runs behind a trusted reverse proxy.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Trait for types that provide access to HTTP headers and extensions.
/// Implemented for `Request` so middleware can extract the IP before the handler runs.
pub trait HasHeadersAndExtensions {
    fn headers(&self) -> &axum::http::HeaderMap;
    fn extensions(&self) -> &axum::http::Extensions;
}

impl<B> HasHeadersAndExtensions for axum::extract::Request<B> {
    fn headers(&self) -> &axum::http::HeaderMap {
        axum::extract::Request::headers(self)
    }
    fn extensions(&self) -> &axum::http::Extensions {
        axum::extract::Request::extensions(self)
    }
}

/// Extract the client IP address.
///
/// With `trust_forwarded_for`, the last address of `X-Forwarded-For` is used,
/// the hop appended by the trusted proxy. Earlier hops are client-controlled.
/// A missing or malformed header is an error (no fallback to the socket).
/// Otherwise the peer address from `ConnectInfo` is used.
pub fn extract_client_ip<T: HasHeadersAndExtensions>(
    source: &T,
    trust_forwarded_for: bool,
) -> Result<String, &'static str> {
    if trust_forwarded_for {
        let header_value = source
            .headers()
            .get(FORWARDED_FOR_HEADER)
            .ok_or("IP header not present")?
            .to_str()
            .map_err(|_| "IP header contains invalid characters")?;
        let last = header_value.rsplit(',').next().unwrap_or("").trim();
        return last
            .parse::<IpAddr>()
            .map(|ip| ip.to_string())
            .map_err(|_| "IP header is not a valid address");
    }

    source
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .ok_or("No client IP available")
}
