//! Per-request exchange state.
//!
//! # Responsibilities
//! - Carry the inbound request facts filters need (id, method, URI, peer)
//! - Hold the gateway attributes filters read and write
//!   (request URL, scheme prefix, original URLs)
//! - Record the affinity decision for logs and the forwarder

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderMap, Method, Uri};

use crate::discovery::ServiceInstance;
use crate::routing::Route;

/// Mutable state of one request moving through the filter chain.
#[derive(Debug)]
pub struct Exchange {
    request_id: String,
    method: Method,
    uri: Uri,
    remote_addr: SocketAddr,
    forwarded_for: Option<String>,
    route: Option<Arc<Route>>,

    request_url: Option<Uri>,
    scheme_prefix: Option<String>,
    original_request_urls: Vec<Uri>,

    affinity: Option<AffinityDecision>,
}

/// What the IP hash interceptor decided for this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffinityDecision {
    /// Logical service name taken from the request URL host.
    pub service_id: String,
    pub client_key: String,
    /// Scheme that replaces the instance's native one, if the route set a prefix.
    pub scheme_override: Option<String>,
    pub instance: Option<ServiceInstance>,
}

impl Exchange {
    pub fn new(request_id: impl Into<String>, method: Method, uri: Uri, remote_addr: SocketAddr) -> Self {
        Self {
            request_id: request_id.into(),
            method,
            uri,
            remote_addr,
            forwarded_for: None,
            route: None,
            request_url: None,
            scheme_prefix: None,
            original_request_urls: Vec::new(),
            affinity: None,
        }
    }

    /// Capture the first `X-Forwarded-For` entry, if any.
    pub fn with_headers(mut self, headers: &HeaderMap) -> Self {
        self.forwarded_for = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        self
    }

    pub fn with_route(mut self, route: Arc<Route>) -> Self {
        self.route = Some(route);
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The inbound request URI, as received.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn forwarded_for(&self) -> Option<&str> {
        self.forwarded_for.as_deref()
    }

    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.as_ref()
    }

    /// Where the request will be forwarded, once resolved.
    pub fn request_url(&self) -> Option<&Uri> {
        self.request_url.as_ref()
    }

    pub fn set_request_url(&mut self, url: Uri) {
        self.request_url = Some(url);
    }

    pub fn scheme_prefix(&self) -> Option<&str> {
        self.scheme_prefix.as_deref()
    }

    pub fn set_scheme_prefix(&mut self, prefix: Option<String>) {
        self.scheme_prefix = prefix;
    }

    /// Request URLs replaced by filters, oldest first.
    pub fn original_request_urls(&self) -> &[Uri] {
        &self.original_request_urls
    }

    pub fn add_original_request_url(&mut self, url: Uri) {
        self.original_request_urls.push(url);
    }

    pub fn affinity(&self) -> Option<&AffinityDecision> {
        self.affinity.as_ref()
    }

    pub(crate) fn set_affinity(&mut self, decision: AffinityDecision) {
        self.affinity = Some(decision);
    }

    pub(crate) fn affinity_mut(&mut self) -> Option<&mut AffinityDecision> {
        self.affinity.as_mut()
    }
}
