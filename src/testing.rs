// src/testing.rs
// Fakes for the probe and forward seams.
use crate::health::Prober;
use crate::proxy::{Backend, Forwarder};
use async_trait::async_trait;
use hyper::{Body, Request, Response};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Answers probes from a settable table; unknown addresses are dead.
#[derive(Default)]
pub struct FakeProber {
    alive: Mutex<HashMap<String, bool>>,
    probes: Mutex<Vec<String>>,
}

impl FakeProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, address: &str, alive: bool) {
        self.alive.lock().unwrap().insert(address.to_string(), alive);
    }

    /// Every address probed so far, in order.
    pub fn probes(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }

    pub fn probe_count(&self) -> usize {
        self.probes.lock().unwrap().len()
    }

    pub fn reset_probes(&self) {
        self.probes.lock().unwrap().clear();
    }
}

#[async_trait]
impl Prober for FakeProber {
    async fn check(&self, address: &str) -> bool {
        self.probes.lock().unwrap().push(address.to_string());
        self.alive
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .unwrap_or(false)
    }
}

pub type ForwardLog = Arc<Mutex<Vec<String>>>;

/// Answers with its own address as the body and logs each forward.
pub struct RecordingForwarder {
    address: String,
    log: ForwardLog,
}

impl RecordingForwarder {
    pub fn new(address: &str, log: ForwardLog) -> Arc<Self> {
        Arc::new(Self {
            address: address.to_string(),
            log,
        })
    }

    pub fn detached(address: &str) -> Arc<Self> {
        Self::new(address, ForwardLog::default())
    }
}

#[async_trait]
impl Forwarder for RecordingForwarder {
    async fn forward(&self, _req: Request<Body>) -> Response<Body> {
        self.log.lock().unwrap().push(self.address.clone());
        Response::new(Body::from(self.address.clone()))
    }
}

/// Builds one backend per `(address, alive)` pair sharing a prober and log.
pub fn backends(table: &[(&str, bool)]) -> (Vec<Backend>, Arc<FakeProber>, ForwardLog) {
    let prober = Arc::new(FakeProber::new());
    let log = ForwardLog::default();

    let backends = table
        .iter()
        .map(|(address, alive)| {
            prober.set(address, *alive);
            Backend::new(
                *address,
                prober.clone(),
                RecordingForwarder::new(address, log.clone()),
            )
        })
        .collect();

    (backends, prober, log)
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
