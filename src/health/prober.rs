// src/health/prober.rs
use async_trait::async_trait;
use std::future::Future;
use std::io;
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

/// On-demand liveness check against a backend address.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Returns `true` if `address` is reachable right now.
    async fn check(&self, address: &str) -> bool;
}

/// Probes a backend with a bare TCP connect. No HTTP is exchanged; a
/// completed handshake within `timeout` is enough to count as alive.
#[derive(Debug, Clone)]
pub struct TcpProber {
    timeout: Duration,
}

impl TcpProber {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Waits up to `timeout` for `connect` and reports whether it succeeded.
    async fn settle<F>(&self, address: &str, connect: F) -> bool
    where
        F: Future<Output = io::Result<TcpStream>>,
    {
        match timeout(self.timeout, connect).await {
            Ok(Ok(stream)) => {
                // Connection is closed as soon as the stream drops.
                drop(stream);
                debug!(backend = %address, "Backend is alive");
                true
            }
            Ok(Err(e)) => {
                warn!(backend = %address, error = %e, "Backend is dead");
                false
            }
            Err(_) => {
                warn!(
                    backend = %address,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Backend is dead: connect timed out"
                );
                false
            }
        }
    }
}

impl Default for TcpProber {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn check(&self, address: &str) -> bool {
        debug!(backend = %address, "Started health check");

        self.settle(address, TcpStream::connect(address)).await
    }
}
