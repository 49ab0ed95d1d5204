// src/load_balancer/round_robin.rs
use crate::load_balancer::LoadBalancer;
use crate::proxy::Backend;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Round-robin over a fixed backend list with probe-then-failover.
///
/// The cursor holds the index of the backend most recently selected, or
/// `None` before the first dispatch. Each call sweeps forward from the
/// cursor, probing every candidate in turn, until one is alive or every
/// backend has been tried once. The cursor advances past dead backends as
/// well, so a sweep that finds nothing still moves the starting point.
///
/// The whole sweep runs under one lock: concurrent callers see a
/// consistent cursor and never probe the same slot for the same turn.
/// The lock is released before the caller forwards.
pub struct RoundRobinBalancer {
    cursor: Mutex<Option<usize>>,
}

impl RoundRobinBalancer {
    pub fn new() -> Self {
        Self {
            cursor: Mutex::new(None),
        }
    }

    /// Index of the most recently selected backend.
    pub async fn cursor(&self) -> Option<usize> {
        *self.cursor.lock().await
    }
}

impl Default for RoundRobinBalancer {
    fn default() -> Self {
        Self::new()
    }
}

fn next_index(cursor: Option<usize>, len: usize) -> usize {
    cursor.map_or(0, |index| (index + 1) % len)
}

#[async_trait]
impl LoadBalancer for RoundRobinBalancer {
    async fn select_backend(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        if backends.is_empty() {
            return None;
        }

        let mut cursor = self.cursor.lock().await;

        for attempted in 1..=backends.len() {
            let index = next_index(*cursor, backends.len());
            let backend = &backends[index];
            let alive = backend.probe().await;
            *cursor = Some(index);

            if alive {
                debug!(backend = %backend.address(), index, "Updated latest backend");
                return Some(backend.clone());
            }

            debug!(
                backend = %backend.address(),
                index,
                attempted,
                "Skipping dead backend"
            );
        }

        warn!(attempted = backends.len(), "Every backend failed its probe");
        None
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::backends;
    use proptest::prelude::*;

    fn arcs(list: Vec<Backend>) -> Vec<Arc<Backend>> {
        list.into_iter().map(Arc::new).collect()
    }

    async fn select_address(balancer: &RoundRobinBalancer, pool: &[Arc<Backend>]) -> Option<String> {
        balancer
            .select_backend(pool)
            .await
            .map(|backend| backend.address().to_string())
    }

    #[test]
    fn next_index_wraps() {
        assert_eq!(next_index(None, 3), 0);
        assert_eq!(next_index(Some(0), 3), 1);
        assert_eq!(next_index(Some(2), 3), 0);
        assert_eq!(next_index(Some(0), 1), 0);
    }

    #[tokio::test]
    async fn empty_pool_selects_nothing_without_probing() {
        let (_, prober, _) = backends(&[]);
        let balancer = RoundRobinBalancer::new();

        assert!(balancer.select_backend(&[]).await.is_none());
        assert_eq!(prober.probe_count(), 0);
        assert_eq!(balancer.cursor().await, None);
    }

    #[tokio::test]
    async fn skips_dead_first_backend() {
        let (list, prober, _) = backends(&[("a:1", false), ("b:2", true), ("c:3", true)]);
        let pool = arcs(list);
        let balancer = RoundRobinBalancer::new();

        assert_eq!(select_address(&balancer, &pool).await.as_deref(), Some("b:2"));
        assert_eq!(prober.probes(), vec!["a:1", "b:2"]);
        assert_eq!(balancer.cursor().await, Some(1));
        assert!(!pool[0].is_alive());
        assert!(pool[1].is_alive());
    }

    #[tokio::test]
    async fn rotates_in_fixed_cyclic_order() {
        let (list, _, _) = backends(&[("a:1", true), ("b:2", true), ("c:3", true)]);
        let pool = arcs(list);
        let balancer = RoundRobinBalancer::new();

        let mut picks = Vec::new();
        for _ in 0..6 {
            picks.push(select_address(&balancer, &pool).await.unwrap());
        }

        assert_eq!(picks, vec!["a:1", "b:2", "c:3", "a:1", "b:2", "c:3"]);
        assert_eq!(balancer.cursor().await, Some(2));
    }

    #[tokio::test]
    async fn dead_backend_is_probed_but_never_selected() {
        let (list, prober, _) = backends(&[("a:1", true), ("b:2", false), ("c:3", true)]);
        let pool = arcs(list);
        let balancer = RoundRobinBalancer::new();

        let mut picks = Vec::new();
        for _ in 0..4 {
            picks.push(select_address(&balancer, &pool).await.unwrap());
        }

        assert_eq!(picks, vec!["a:1", "c:3", "a:1", "c:3"]);
        assert_eq!(
            prober.probes(),
            vec!["a:1", "b:2", "c:3", "a:1", "b:2", "c:3"]
        );
    }

    #[tokio::test]
    async fn failover_wraps_past_the_end() {
        let (list, _, _) = backends(&[("a:1", true), ("b:2", true), ("c:3", false)]);
        let pool = arcs(list);
        let balancer = RoundRobinBalancer::new();

        select_address(&balancer, &pool).await;
        select_address(&balancer, &pool).await;

        assert_eq!(select_address(&balancer, &pool).await.as_deref(), Some("a:1"));
        assert_eq!(balancer.cursor().await, Some(0));
    }

    #[tokio::test]
    async fn single_dead_backend_gives_up_after_one_probe() {
        let (list, prober, _) = backends(&[("a:1", false)]);
        let pool = arcs(list);
        let balancer = RoundRobinBalancer::new();

        assert!(select_address(&balancer, &pool).await.is_none());
        assert_eq!(prober.probe_count(), 1);
        assert_eq!(balancer.cursor().await, Some(0));
    }

    #[tokio::test]
    async fn failed_sweep_still_advances_start() {
        let (list, prober, _) = backends(&[("a:1", false), ("b:2", false), ("c:3", false)]);
        let pool = arcs(list);
        let balancer = RoundRobinBalancer::new();

        assert!(select_address(&balancer, &pool).await.is_none());
        assert_eq!(balancer.cursor().await, Some(2));

        // b:2 comes back; the next sweep starts over at a:1.
        prober.set("b:2", true);
        prober.reset_probes();
        assert_eq!(select_address(&balancer, &pool).await.as_deref(), Some("b:2"));
        assert_eq!(prober.probes(), vec!["a:1", "b:2"]);
    }

    #[tokio::test]
    async fn recovered_backend_rejoins_rotation() {
        let (list, prober, _) = backends(&[("a:1", true), ("b:2", false)]);
        let pool = arcs(list);
        let balancer = RoundRobinBalancer::new();

        assert_eq!(select_address(&balancer, &pool).await.as_deref(), Some("a:1"));
        assert_eq!(select_address(&balancer, &pool).await.as_deref(), Some("a:1"));

        prober.set("b:2", true);
        assert_eq!(select_address(&balancer, &pool).await.as_deref(), Some("b:2"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_selections_keep_cursor_valid() {
        let (list, _, _) = backends(&[("a:1", true), ("b:2", true), ("c:3", true), ("d:4", true)]);
        let pool = Arc::new(arcs(list));
        let balancer = Arc::new(RoundRobinBalancer::new());

        let tasks: Vec<_> = (0..64)
            .map(|_| {
                let pool = pool.clone();
                let balancer = balancer.clone();
                tokio::spawn(async move { select_address(&balancer, &pool).await })
            })
            .collect();

        let picks: Vec<String> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        assert_eq!(picks.len(), 64);
        // One critical section per selection: the turns are shared out evenly.
        for address in ["a:1", "b:2", "c:3", "d:4"] {
            assert_eq!(picks.iter().filter(|pick| *pick == address).count(), 16);
        }
        assert_eq!(balancer.cursor().await, Some(3));
    }

    proptest! {
        #[test]
        fn all_dead_sweep_probes_each_backend_once(len in 1usize..16, warmup in 0usize..8) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                let addresses: Vec<String> = (0..len).map(|i| format!("10.0.0.{i}:80")).collect();
                let table: Vec<(&str, bool)> = addresses.iter().map(|a| (a.as_str(), true)).collect();
                let (list, prober, _) = backends(&table);
                let pool = arcs(list);
                let balancer = RoundRobinBalancer::new();

                for _ in 0..warmup {
                    balancer.select_backend(&pool).await;
                }
                for address in &addresses {
                    prober.set(address, false);
                }
                prober.reset_probes();

                assert!(balancer.select_backend(&pool).await.is_none());
                assert_eq!(prober.probe_count(), len);

                let mut probed = prober.probes();
                probed.sort();
                probed.dedup();
                assert_eq!(probed.len(), len);
            });
        }

        #[test]
        fn all_alive_visits_each_backend_once_per_round(len in 1usize..16, warmup in 0usize..16) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                let addresses: Vec<String> = (0..len).map(|i| format!("10.0.0.{i}:80")).collect();
                let table: Vec<(&str, bool)> = addresses.iter().map(|a| (a.as_str(), true)).collect();
                let (list, _, _) = backends(&table);
                let pool = arcs(list);
                let balancer = RoundRobinBalancer::new();

                for _ in 0..warmup {
                    balancer.select_backend(&pool).await;
                }
                let start = next_index(balancer.cursor().await, len);

                for offset in 0..len {
                    let picked = select_address(&balancer, &pool).await.unwrap();
                    assert_eq!(picked, addresses[(start + offset) % len]);
                }
            });
        }
    }
}
