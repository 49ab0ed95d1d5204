// ────────────────────────────────
// src/proxy/proxy.rs
// Request dispatcher in front of the backend pool
// ────────────────────────────────

use super::BackendPool;
use hyper::header::{HeaderValue, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use hyper::{Body, Request, Response, StatusCode};
use std::sync::Arc;

pub struct Proxy {
    pool: Arc<BackendPool>,
}

impl Proxy {
    pub fn new(pool: Arc<BackendPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &BackendPool {
        &self.pool
    }

    pub async fn handle(&self, req: Request<Body>) -> Result<Response<Body>, ProxyError> {
        self.pool.dispatch(req).await
    }
}

// Custom error type for proxy operations
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("No Servers Available")]
    NoBackendsAvailable,

    #[error("Upstream error: {0}")]
    Upstream(#[from] hyper::Error),

    #[error("Failed to rewrite request: {0}")]
    Rewrite(#[from] hyper::http::Error),

    #[error("Invalid backend address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NoBackendsAvailable => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Rewrite(_) | ProxyError::InvalidAddress { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// Convert ProxyError to Hyper Response for error handling
impl From<ProxyError> for Response<Body> {
    fn from(err: ProxyError) -> Self {
        let status = err.status();
        let message = match err {
            ProxyError::NoBackendsAvailable => "No Servers Available",
            ProxyError::Upstream(_) => "Bad Gateway",
            ProxyError::Rewrite(_) | ProxyError::InvalidAddress { .. } => "Internal Server Error",
        };

        let mut response = Response::new(Body::from(format!("{}\n", message)));
        *response.status_mut() = status;
        let headers = response.headers_mut();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        response
    }
}
