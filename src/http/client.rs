//! Upstream HTTP client.
//!
//! # Responsibilities
//! - Open a connection to a target
//! - Send one prepared request over it
//! - Classify transport errors into health outcomes
//!
//! # Design Decisions
//! - Connecting and sending are separate steps so the router can put each
//!   under its own deadline
//! - Every attempt dials a fresh HTTP/1.1 connection; no idle pool sits
//!   between the proxy and its health view of a target
//!
//! The router depends on the [`Forwarder`] trait only, so tests can swap the
//! network for a stub.

use std::future::Future;

use axum::body::Body;
use axum::http::{Request, Response};
use hyper::client::conn::http1::{self, SendRequest};
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::TcpStream;

use crate::health::Outcome;
use crate::load_balancer::target::Target;
use crate::resilience::DeadlineElapsed;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Transport-level failure of a single attempt.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("connect timed out")]
    ConnectTimeout,

    #[error(transparent)]
    Deadline(#[from] DeadlineElapsed),

    #[error("connection failed: {0}")]
    Connect(#[source] BoxError),

    #[error("upstream transport error: {0}")]
    Transport(#[source] BoxError),
}

impl ForwardError {
    pub fn outcome(&self) -> Outcome {
        match self {
            ForwardError::ConnectTimeout | ForwardError::Deadline(_) => Outcome::Timeout,
            ForwardError::Connect(_) | ForwardError::Transport(_) => Outcome::ConnectionFailure,
        }
    }

    fn connect(err: std::io::Error) -> Self {
        if has_timed_out(&err) {
            ForwardError::ConnectTimeout
        } else {
            ForwardError::Connect(Box::new(err))
        }
    }
}

/// Walk the source chain looking for an I/O timeout.
fn has_timed_out(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = Some(err);
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        source = e.source();
    }
    false
}

/// Connects to targets and sends prepared requests over those connections.
pub trait Forwarder: Send + Sync + 'static {
    /// An established connection, ready for one request.
    type Connection: Send;

    fn connect(
        &self,
        target: &Target,
    ) -> impl Future<Output = Result<Self::Connection, ForwardError>> + Send;

    /// Send `request` and resolve once the response headers arrive.
    fn send(
        &self,
        connection: Self::Connection,
        request: Request<Body>,
    ) -> impl Future<Output = Result<Response<Body>, ForwardError>> + Send;
}

/// Forwarder speaking HTTP/1.1 over plain TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpForwarder;

impl HttpForwarder {
    pub fn new() -> Self {
        Self
    }
}

impl Forwarder for HttpForwarder {
    type Connection = SendRequest<Body>;

    async fn connect(&self, target: &Target) -> Result<Self::Connection, ForwardError> {
        let stream = TcpStream::connect(target.authority().as_str())
            .await
            .map_err(ForwardError::connect)?;
        stream.set_nodelay(true).map_err(ForwardError::connect)?;

        let (sender, connection) = http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| ForwardError::Connect(Box::new(e)))?;

        let target_id = target.id().clone();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!(target_id = %target_id, error = %e, "Upstream connection closed with error");
            }
        });

        Ok(sender)
    }

    async fn send(
        &self,
        mut connection: Self::Connection,
        request: Request<Body>,
    ) -> Result<Response<Body>, ForwardError> {
        let response = connection
            .send_request(request)
            .await
            .map_err(|e| ForwardError::Transport(Box::new(e)))?;
        Ok(response.map(Body::new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    use axum::http::{header, StatusCode};
    use http_body_util::BodyExt;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use crate::health::QuarantinePolicy;

    fn target(addr: std::net::SocketAddr) -> Target {
        Target::new(addr.to_string().parse().unwrap(), &QuarantinePolicy::default())
    }

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(ForwardError::ConnectTimeout.outcome(), Outcome::Timeout);
        assert_eq!(
            ForwardError::from(DeadlineElapsed::Response).outcome(),
            Outcome::Timeout
        );
        assert_eq!(
            ForwardError::Connect("connection refused".into()).outcome(),
            Outcome::ConnectionFailure
        );
        assert_eq!(
            ForwardError::Transport("connection reset".into()).outcome(),
            Outcome::ConnectionFailure
        );
    }

    #[test]
    fn test_timeout_detected_in_source_chain() {
        #[derive(Debug, Error)]
        #[error("wrapper")]
        struct Wrapper(#[source] io::Error);

        let wrapped = Wrapper(io::Error::new(io::ErrorKind::TimedOut, "connect timeout"));
        assert!(has_timed_out(&wrapped));

        let refused = Wrapper(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert!(!has_timed_out(&refused));
    }

    #[tokio::test]
    async fn test_refused_connection_is_connection_failure() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = HttpForwarder::new().connect(&target(addr)).await.unwrap_err();
        assert_eq!(err.outcome(), Outcome::ConnectionFailure);
    }

    #[tokio::test]
    async fn test_request_over_fresh_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await.unwrap();
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok")
                .await
                .unwrap();
        });

        let forwarder = HttpForwarder::new();
        let connection = forwarder.connect(&target(addr)).await.unwrap();
        let request = Request::builder()
            .uri("/ping")
            .header(header::HOST, addr.to_string())
            .body(Body::empty())
            .unwrap();

        let response = forwarder.send(connection, request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }
}
