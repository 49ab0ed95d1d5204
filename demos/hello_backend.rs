//! demos/hello_backend.rs
//! Run: cargo run --example hello_backend -- <port>
//!
//! Start three of these on 8081, 8083 and 8085 to match the balancer's
//! default backend list.

use hyper::{
    header::HeaderValue,
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server,
};
use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

const ECHOED_HEADERS: [(&str, &str); 3] = [
    ("x-forwarded-host", "echo-x-forwarded-host"),
    ("x-origin-host", "echo-x-origin-host"),
    ("x-forwarded-for", "echo-x-forwarded-for"),
];

#[derive(Clone)]
struct BackendState {
    port: u16,
    req_counter: Arc<AtomicU64>,
}

// ——————————————————————————————————————————
// Request handler
async fn handle(req: Request<Body>, state: BackendState) -> Result<Response<Body>, Infallible> {
    let n = state.req_counter.fetch_add(1, Ordering::SeqCst) + 1;
    println!("[{}] #{} {} {}", state.port, n, req.method(), req.uri());

    let mut response = Response::new(Body::from(format!("Hello from port {}!", state.port)));

    // Reflect the balancer's forwarding headers so they show up in `curl -i`.
    for (received, echoed) in ECHOED_HEADERS {
        if let Some(value) = req.headers().get(received) {
            response.headers_mut().insert(echoed, value.clone());
        }
    }
    response
        .headers_mut()
        .insert("x-backend-port", HeaderValue::from(state.port));

    Ok(response)
}

// ——————————————————————————————————————————
// Main
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let port: u16 = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "8081".into())
        .parse()?;

    let state = BackendState {
        port,
        req_counter: Arc::new(AtomicU64::new(0)),
    };

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let make_svc = make_service_fn(move |_conn| {
        let st = state.clone();
        async move { Ok::<_, Infallible>(service_fn(move |req| handle(req, st.clone()))) }
    });

    println!("Hello backend on http://{}", addr);

    Server::bind(&addr).serve(make_svc).await?;
    Ok(())
}
