// src/health/mod.rs
mod prober;

pub use prober::{Prober, TcpProber};
