// src/proxy/forwarder.rs
use super::ProxyError;
use async_trait::async_trait;
use hyper::client::HttpConnector;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONNECTION, HOST};
use hyper::http::uri::{Authority, PathAndQuery, Scheme};
use hyper::{Body, Client, Request, Response, Uri};
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::error;

pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_ORIGIN_HOST: HeaderName = HeaderName::from_static("x-origin-host");
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Headers that only describe a single transport hop.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Peer address of the inbound connection, attached as a request extension
/// by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientAddr(pub SocketAddr);

/// Relays one request to a fixed upstream and hands back its response.
///
/// Implementations never fail: an upstream error becomes an error response.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, req: Request<Body>) -> Response<Body>;
}

/// Plain-HTTP reverse proxy to a single `host:port`.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    origin: Authority,
    origin_header: HeaderValue,
    client: Client<HttpConnector>,
}

impl HttpForwarder {
    pub fn new(address: &str, client: Client<HttpConnector>) -> Result<Self, ProxyError> {
        let invalid = |reason: String| ProxyError::InvalidAddress {
            address: address.to_string(),
            reason,
        };

        let origin = Authority::from_str(address).map_err(|e| invalid(e.to_string()))?;
        let origin_header =
            HeaderValue::from_str(origin.as_str()).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            origin,
            origin_header,
            client,
        })
    }

    /// Points `req` at this forwarder's origin and adds the forwarding headers.
    pub fn rewrite(&self, req: &mut Request<Body>) -> Result<(), ProxyError> {
        let original_host = req.headers().get(HOST).cloned().or_else(|| {
            req.uri()
                .authority()
                .and_then(|authority| HeaderValue::from_str(authority.as_str()).ok())
        });
        let client_addr = req.extensions().get::<ClientAddr>().copied();

        let headers = req.headers_mut();
        remove_hop_by_hop_headers(headers);
        if let Some(host) = original_host {
            headers.append(X_FORWARDED_HOST, host);
        }
        headers.append(X_ORIGIN_HOST, self.origin_header.clone());
        if let Some(ClientAddr(peer)) = client_addr {
            append_forwarded_for(headers, peer)?;
        }

        let mut parts = req.uri().clone().into_parts();
        parts.scheme = Some(Scheme::HTTP);
        parts.authority = Some(self.origin.clone());
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        *req.uri_mut() = Uri::from_parts(parts).map_err(hyper::http::Error::from)?;

        Ok(())
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(&self, mut req: Request<Body>) -> Response<Body> {
        if let Err(e) = self.rewrite(&mut req) {
            error!(backend = %self.origin, error = %e, "Failed to rewrite request");
            return e.into();
        }

        match self.client.request(req).await {
            Ok(mut response) => {
                remove_hop_by_hop_headers(response.headers_mut());
                response
            }
            Err(e) => {
                error!(backend = %self.origin, error = %e, "Upstream request failed");
                ProxyError::Upstream(e).into()
            }
        }
    }
}

fn remove_hop_by_hop_headers(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
}

/// Folds any incoming `X-Forwarded-For` chain into one value and appends the peer.
fn append_forwarded_for(headers: &mut HeaderMap, peer: SocketAddr) -> Result<(), ProxyError> {
    let mut chain: Vec<String> = headers
        .get_all(&X_FORWARDED_FOR)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_string)
        .collect();
    chain.push(peer.ip().to_string());

    let value = HeaderValue::from_str(&chain.join(", ")).map_err(hyper::http::Error::from)?;
    headers.insert(X_FORWARDED_FOR, value);
    Ok(())
}
