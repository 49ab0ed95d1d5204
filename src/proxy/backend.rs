// src/proxy/backend.rs
use super::Forwarder;
use crate::health::Prober;
use hyper::{Body, Request, Response};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One upstream server in the pool.
pub struct Backend {
    address: String,
    alive: AtomicBool,
    prober: Arc<dyn Prober>,
    forwarder: Arc<dyn Forwarder>,
}

impl Backend {
    /// Creates a backend that is considered dead until its first probe.
    pub fn new(
        address: impl Into<String>,
        prober: Arc<dyn Prober>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        Self {
            address: address.into(),
            alive: AtomicBool::new(false),
            prober,
            forwarder,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Result of the most recent probe. Advisory only.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Checks reachability now and records the outcome.
    pub async fn probe(&self) -> bool {
        let alive = self.prober.check(&self.address).await;
        self.alive.store(alive, Ordering::Release);
        alive
    }

    pub async fn forward(&self, req: Request<Body>) -> Response<Body> {
        self.forwarder.forward(req).await
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("address", &self.address)
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}
