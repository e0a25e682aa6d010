//! Request handling and transformation.
//!
//! # Responsibilities
//! - Buffer the inbound request so every attempt can replay it
//! - Address the request to the selected target
//! - Strip hop-by-hop headers and add forwarding headers
//!
//! # Design Decisions
//! - Original request kept immutable; a fresh copy is built per attempt
//! - Method, path, query, end-to-end headers and body pass through unmodified

use std::net::SocketAddr;

use axum::body::{Body, Bytes};
use axum::http::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    uri::PathAndQuery,
    Method, Request, Uri,
};

use http_body_util::{BodyExt, LengthLimitError, Limited};

use crate::http::client::BoxError;
use crate::load_balancer::target::Target;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Headers meaningful only for a single transport-level connection.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Error raised while buffering the inbound body.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    Read(#[source] BoxError),
}

/// A buffered inbound request, replayable across attempts.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    client_addr: Option<SocketAddr>,
}

impl ProxyRequest {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            client_addr: None,
        }
    }

    pub fn with_client_addr(mut self, addr: SocketAddr) -> Self {
        self.client_addr = Some(addr);
        self
    }

    /// Buffer an inbound request, refusing bodies over `max_body_size`.
    pub async fn from_request(
        request: Request<Body>,
        client_addr: SocketAddr,
        max_body_size: usize,
    ) -> Result<Self, BodyError> {
        let (parts, body) = request.into_parts();

        let declared = parts
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        if declared.is_some_and(|len| len > max_body_size as u64) {
            return Err(BodyError::TooLarge { limit: max_body_size });
        }

        let body = Limited::new(body, max_body_size)
            .collect()
            .await
            .map_err(|e| {
                if e.downcast_ref::<LengthLimitError>().is_some() {
                    BodyError::TooLarge { limit: max_body_size }
                } else {
                    BodyError::Read(e)
                }
            })?
            .to_bytes();

        Ok(Self::new(parts.method, parts.uri, parts.headers, body).with_client_addr(client_addr))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn request_id(&self) -> Option<&str> {
        self.headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok())
    }

    /// Build the request sent to `target` for one attempt.
    pub fn upstream_request(&self, target: &Target) -> Result<Request<Body>, axum::http::Error> {
        // Origin-form: the connection is already open to the target and
        // `Host` names it.
        let uri: Uri = self
            .uri
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"))
            .into();

        let mut headers = self.headers.clone();
        strip_hop_by_hop(&mut headers);
        self.add_forwarding_headers(&mut headers);
        headers.insert(header::HOST, HeaderValue::from_str(target.authority().as_str())?);

        let mut request = Request::builder()
            .method(self.method.clone())
            .uri(uri)
            .body(Body::from(self.body.clone()))?;
        *request.headers_mut() = headers;
        Ok(request)
    }

    fn add_forwarding_headers(&self, headers: &mut HeaderMap) {
        let original_host = self
            .headers
            .get(header::HOST)
            .cloned()
            .or_else(|| {
                self.uri
                    .authority()
                    .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
            });
        if let Some(host) = original_host {
            headers.insert(X_FORWARDED_HOST, host);
        }

        if let Some(addr) = self.client_addr {
            let client_ip = addr.ip().to_string();
            let forwarded_for = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
                Some(existing) if !existing.is_empty() => format!("{existing}, {client_ip}"),
                _ => client_ip,
            };
            if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
                headers.insert(X_FORWARDED_FOR, value);
            }
        }

        // The listener only speaks plain HTTP.
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));
    }
}

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}
