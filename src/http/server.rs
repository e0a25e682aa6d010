//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing)
//! - Bound concurrent in-flight requests
//! - Serve until the shutdown signal fires, then drain

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::request::{BodyError, ProxyRequest};
use crate::http::response;
use crate::load_balancer::pool::{PoolError, TargetPool};
use crate::observability::metrics;
use crate::routing::ProxyRouter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<ProxyRouter>,
    pub max_body_size: usize,
    pub in_flight: Arc<Semaphore>,
}

/// HTTP server for the load-balancing proxy.
pub struct HttpServer {
    router: Router,
    pool: Arc<TargetPool>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &ProxyConfig) -> Result<Self, PoolError> {
        let proxy = Arc::new(ProxyRouter::from_config(&config.pool)?);
        let pool = proxy.pool().clone();

        let state = AppState {
            proxy,
            max_body_size: config.listener.max_body_size,
            in_flight: Arc::new(Semaphore::new(config.listener.max_connections)),
        };

        Ok(Self {
            router: Self::build_router(state),
            pool,
        })
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Shared handle to the target pool, for the admin API.
    pub fn pool(&self) -> Arc<TargetPool> {
        self.pool.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            targets = self.pool.targets().len(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all proxy handler.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();

    let response = match state.in_flight.clone().acquire_owned().await {
        Ok(_permit) => proxy_request(&state, client, request).await,
        Err(_) => response::internal_error(),
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

async fn proxy_request(state: &AppState, client: SocketAddr, request: Request<Body>) -> Response {
    let request = match ProxyRequest::from_request(request, client, state.max_body_size).await {
        Ok(request) => request,
        Err(BodyError::TooLarge { limit }) => {
            tracing::warn!(client = %client, limit, "Request body too large");
            return response::payload_too_large(limit);
        }
        Err(e) => {
            tracing::warn!(client = %client, error = %e, "Failed to read request body");
            return (StatusCode::BAD_REQUEST, "Failed to read request body").into_response();
        }
    };

    state.proxy.forward(&request).await.into_response()
}
