// src/proxy/pool.rs
use super::backend::Backend;
use super::{HttpForwarder, ProxyError};
use crate::config::Config;
use crate::health::{Prober, TcpProber};
use crate::load_balancer::{LoadBalancer, RoundRobinBalancer};
use hyper::{Body, Client, Request, Response};
use std::sync::Arc;
use tracing::{info, warn};

/// Fixed, ordered set of backends plus the rotation that picks among them.
///
/// The list is never reordered or resized after construction; only each
/// backend's liveness flag and the balancer's cursor change over time. Dead
/// backends stay in rotation and are re-probed on every turn.
pub struct BackendPool {
    backends: Vec<Arc<Backend>>,
    balancer: Arc<dyn LoadBalancer>,
}

impl BackendPool {
    /// Builds the pool and probes every backend once to seed its liveness.
    pub async fn new(backends: Vec<Backend>) -> Self {
        let backends: Vec<Arc<Backend>> = backends.into_iter().map(Arc::new).collect();
        let addresses: Vec<&str> = backends.iter().map(|b| b.address()).collect();
        info!(?addresses, "Creating backend pool");

        futures::future::join_all(backends.iter().map(|backend| backend.probe())).await;

        for backend in &backends {
            info!(
                backend = %backend.address(),
                alive = backend.is_alive(),
                "Backend added to pool"
            );
        }

        let balancer: Arc<dyn LoadBalancer> = Arc::new(RoundRobinBalancer::new());
        info!(
            algorithm = balancer.name(),
            size = backends.len(),
            "Backend pool ready"
        );

        Self { backends, balancer }
    }

    /// One TCP-probed, hyper-forwarded backend per configured address.
    pub async fn from_config(config: &Config) -> Result<Self, ProxyError> {
        let prober: Arc<dyn Prober> = Arc::new(TcpProber::new(config.probe.timeout()));
        let client = Client::new();

        let mut backends = Vec::with_capacity(config.backends.len());
        for address in &config.backends {
            let forwarder = HttpForwarder::new(address, client.clone())?;
            backends.push(Backend::new(address.clone(), prober.clone(), Arc::new(forwarder)));
        }

        Ok(Self::new(backends).await)
    }

    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Runs one probe-and-failover sweep.
    pub async fn select(&self) -> Option<Arc<Backend>> {
        self.balancer.select_backend(&self.backends).await
    }

    /// Forwards `req` to the next live backend.
    ///
    /// Failover happens only before forwarding starts. Once a backend has
    /// been chosen, an upstream failure is reported by its forwarder and
    /// never retried elsewhere.
    pub async fn dispatch(&self, req: Request<Body>) -> Result<Response<Body>, ProxyError> {
        let backend = match self.select().await {
            Some(backend) => backend,
            None => {
                warn!(size = self.backends.len(), "No Servers Available");
                return Err(ProxyError::NoBackendsAvailable);
            }
        };

        info!(
            backend = %backend.address(),
            method = %req.method(),
            uri = %req.uri(),
            "Routing request"
        );
        Ok(backend.forward(req).await)
    }
}
