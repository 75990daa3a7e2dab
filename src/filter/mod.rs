//! Gateway filter chain.
//!
//! # Data Flow
//! ```text
//! Matched request
//!     → Exchange (per-request attributes)
//!     → FilterChain, ascending order:
//!         10000 route_to_url.rs (route target + request path → request URL)
//!         10150 ip_hash.rs      (iphash:// → chosen instance URL)
//!     → forwarder (http::server)
//! ```
//!
//! # Design Decisions
//! - Filters are an explicit ordered list, sorted once at construction
//! - A filter short-circuits the chain by returning an error
//! - The exchange lives for one request and is never shared

pub mod exchange;
pub mod ip_hash;
pub mod route_to_url;

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::GatewayError;

pub use exchange::Exchange;
pub use ip_hash::{normalize_client_key, Interception, IpHashFilter, IP_HASH_FILTER_ORDER};
pub use route_to_url::{RouteToRequestUrlFilter, ROUTE_TO_URL_FILTER_ORDER};

/// One stage of request processing.
pub trait GatewayFilter: Send + Sync + fmt::Debug {
    /// Name for logs.
    fn name(&self) -> &'static str;

    /// Position in the chain (lower runs first).
    fn order(&self) -> i32;

    fn filter<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), GatewayError>>;
}

/// Ordered list of filters.
#[derive(Debug, Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn GatewayFilter>>,
}

impl FilterChain {
    pub fn new(mut filters: Vec<Arc<dyn GatewayFilter>>) -> Self {
        filters.sort_by_key(|f| f.order());
        Self { filters }
    }

    /// Run every filter in order; the first error stops the chain.
    pub async fn run(&self, exchange: &mut Exchange) -> Result<(), GatewayError> {
        for filter in &self.filters {
            if let Err(e) = filter.filter(exchange).await {
                tracing::debug!(
                    request_id = %exchange.request_id(),
                    filter = filter.name(),
                    error = %e,
                    "Filter chain short-circuited"
                );
                return Err(e);
            }
        }
        Ok(())
    }

    /// Filter names in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }
}
