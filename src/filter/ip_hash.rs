//! Client-affinity interceptor.
//!
//! # Responsibilities
//! - Recognize requests routed through the affinity scheme
//! - Derive the client key from the caller's address
//! - Ask the bound balancer for an instance and rewrite the request URL
//!
//! # Design Decisions
//! - The instance fetch is the only suspend point; it is bounded by a timeout and
//!   dropped with the request
//! - Empty pool, missing balancer, provider failure and timeout are distinct errors
//! - Nothing is retried here

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::http::Uri;
use futures_util::future::{BoxFuture, FutureExt};

use crate::config::AffinityConfig;
use crate::error::GatewayError;
use crate::filter::exchange::AffinityDecision;
use crate::filter::{Exchange, GatewayFilter};
use crate::load_balancer::{reconstruct_uri, LoadBalancerRegistry};
use crate::observability::metrics;

pub const IP_HASH_FILTER_ORDER: i32 = 10150;

/// Canonical client key for an address written as `ip` or `ip:port`.
///
/// IPv4-mapped IPv6 addresses collapse to their IPv4 form. Returns `None` when
/// the value is not an address.
pub fn normalize_client_key(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let ip = raw
        .parse::<IpAddr>()
        .or_else(|_| raw.parse::<SocketAddr>().map(|addr| addr.ip()))
        .ok()?;
    Some(ip.to_canonical().to_string())
}

/// Result of a successful interception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    /// Not an affinity request; the exchange is untouched.
    Bypassed,
    /// The request URL now points at the chosen instance.
    Forwarded(Uri),
}

/// Rewrites affinity-scheme request URLs to a client-sticky instance.
#[derive(Debug)]
pub struct IpHashFilter {
    scheme: String,
    use_404: bool,
    discovery_timeout: Duration,
    trust_forwarded_for: bool,
    registry: Arc<LoadBalancerRegistry>,
}

impl IpHashFilter {
    pub fn new(config: &AffinityConfig, registry: Arc<LoadBalancerRegistry>) -> Self {
        Self {
            scheme: config.scheme.clone(),
            use_404: config.use_404,
            discovery_timeout: Duration::from_millis(config.discovery_timeout_ms),
            trust_forwarded_for: config.trust_forwarded_for,
            registry,
        }
    }

    /// True when the request URL scheme or the scheme prefix is the affinity marker.
    pub fn applies_to(&self, exchange: &Exchange) -> bool {
        let Some(url) = exchange.request_url() else {
            return false;
        };
        let is_marker = |s: &str| s.eq_ignore_ascii_case(&self.scheme);
        url.scheme_str().is_some_and(is_marker) || exchange.scheme_prefix().is_some_and(is_marker)
    }

    /// Client key: the caller's remote IP, or the first forwarded-for hop when
    /// trusted. A forwarded value that is not an address is ignored.
    pub fn client_key(&self, exchange: &Exchange) -> String {
        if self.trust_forwarded_for {
            if let Some(key) = exchange.forwarded_for().and_then(normalize_client_key) {
                return key;
            }
        }
        exchange.remote_addr().ip().to_canonical().to_string()
    }

    /// Resolve the exchange's target through the bound balancer.
    pub async fn intercept(&self, exchange: &mut Exchange) -> Result<Interception, GatewayError> {
        if !self.applies_to(exchange) {
            return Ok(Interception::Bypassed);
        }
        let Some(url) = exchange.request_url().cloned() else {
            return Ok(Interception::Bypassed);
        };
        exchange.add_original_request_url(url.clone());

        tracing::trace!(request_id = %exchange.request_id(), url = %url, "IpHashFilter url before");

        let service_id = url.host().unwrap_or_default().to_string();
        let client_key = self.client_key(exchange);
        let scheme_override = exchange
            .scheme_prefix()
            .and(url.scheme_str())
            .map(str::to_string);

        exchange.set_affinity(AffinityDecision {
            service_id: service_id.clone(),
            client_key: client_key.clone(),
            scheme_override: scheme_override.clone(),
            instance: None,
        });

        let Some(balancer) = self.registry.get(&service_id) else {
            metrics::record_affinity_decision(&service_id, "no_resolver");
            return Err(GatewayError::NoResolverConfigured(service_id));
        };

        let chosen = match tokio::time::timeout(self.discovery_timeout, balancer.choose(&client_key)).await {
            Ok(Ok(Some(instance))) => instance,
            Ok(Ok(None)) => {
                metrics::record_affinity_decision(&service_id, "no_instance");
                return Err(GatewayError::no_instance(service_id, self.use_404));
            }
            Ok(Err(source)) => {
                metrics::record_affinity_decision(&service_id, "provider_failure");
                return Err(GatewayError::ProviderFailure {
                    service: service_id,
                    source,
                });
            }
            Err(_) => {
                metrics::record_affinity_decision(&service_id, "timeout");
                return Err(GatewayError::DiscoveryTimeout {
                    service: service_id,
                    timeout_ms: self.discovery_timeout.as_millis() as u64,
                });
            }
        };

        let target = reconstruct_uri(&chosen, exchange.uri(), scheme_override.as_deref())?;

        tracing::debug!(
            request_id = %exchange.request_id(),
            service = %service_id,
            client = %client_key,
            instance = %chosen,
            "Affinity instance selected"
        );
        tracing::trace!(request_id = %exchange.request_id(), url = %target, "IpHashFilter url chosen");
        metrics::record_affinity_decision(&service_id, "selected");

        if let Some(decision) = exchange.affinity_mut() {
            decision.instance = Some(chosen);
        }
        exchange.set_request_url(target.clone());
        Ok(Interception::Forwarded(target))
    }
}

impl GatewayFilter for IpHashFilter {
    fn name(&self) -> &'static str {
        "ip_hash"
    }

    fn order(&self) -> i32 {
        IP_HASH_FILTER_ORDER
    }

    fn filter<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), GatewayError>> {
        async move { self.intercept(exchange).await.map(|_| ()) }.boxed()
    }
}
