// src/load_balancer/algorithm.rs
use crate::proxy::Backend;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait LoadBalancer: Send + Sync {
    /// Picks a backend that is reachable right now, probing candidates as
    /// needed. `None` means no backend answered.
    async fn select_backend(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>>;

    fn name(&self) -> &'static str;
}
