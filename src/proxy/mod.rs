// src/proxy/mod.rs
mod backend;
mod forwarder;
mod pool;
mod proxy;

pub use backend::Backend;
pub use forwarder::{
    ClientAddr, Forwarder, HttpForwarder, X_FORWARDED_FOR, X_FORWARDED_HOST, X_ORIGIN_HOST,
};
pub use pool::BackendPool;
pub use proxy::{Proxy, ProxyError};
