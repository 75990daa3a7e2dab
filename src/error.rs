//! Gateway error taxonomy.
//!
//! Every condition that ends a request early maps to its own status code and a
//! stable `x-gateway-error` code so operators can tell them apart.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::discovery::DiscoveryError;
use crate::load_balancer::InvalidTarget;

/// Response header carrying the machine-readable error code.
pub const X_GATEWAY_ERROR: HeaderName = HeaderName::from_static("x-gateway-error");

/// Conditions that terminate a request inside the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The service's pool was empty at selection time.
    #[error("Unable to find instance for {service}")]
    NoInstanceAvailable { service: String, status: StatusCode },

    /// No balancer is bound to the target service.
    #[error("No loadbalancer available for {0}")]
    NoResolverConfigured(String),

    /// The instance provider itself failed.
    #[error("Instance lookup for {service} failed: {source}")]
    ProviderFailure {
        service: String,
        #[source]
        source: DiscoveryError,
    },

    #[error("Instance lookup for {service} timed out after {timeout_ms} ms")]
    DiscoveryTimeout { service: String, timeout_ms: u64 },

    #[error("No matching route found for {0}")]
    NoRouteMatched(String),

    #[error(transparent)]
    InvalidTarget(#[from] InvalidTarget),

    #[error("Upstream request failed: {0}")]
    Upstream(String),
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    /// Empty-pool failure, surfaced as 404 or 503 depending on `use_404`.
    pub fn no_instance(service: impl Into<String>, use_404: bool) -> Self {
        let status = if use_404 {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        Self::NoInstanceAvailable {
            service: service.into(),
            status,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoInstanceAvailable { status, .. } => *status,
            Self::NoResolverConfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ProviderFailure { .. } => StatusCode::BAD_GATEWAY,
            Self::DiscoveryTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::NoRouteMatched(_) => StatusCode::NOT_FOUND,
            Self::InvalidTarget(_) => StatusCode::BAD_GATEWAY,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoInstanceAvailable { .. } => "no_instance_available",
            Self::NoResolverConfigured(_) => "no_resolver_configured",
            Self::ProviderFailure { .. } => "provider_failure",
            Self::DiscoveryTimeout { .. } => "discovery_timeout",
            Self::NoRouteMatched(_) => "no_route",
            Self::InvalidTarget(_) => "invalid_target",
            Self::Upstream(_) => "upstream_failure",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, self.to_string()).into_response();
        response
            .headers_mut()
            .insert(X_GATEWAY_ERROR, HeaderValue::from_static(self.code()));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_instance_status_toggle() {
        assert_eq!(GatewayError::no_instance("orders", true).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            GatewayError::no_instance("orders", false).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            GatewayError::no_instance("s", true),
            GatewayError::NoResolverConfigured("s".into()),
            GatewayError::ProviderFailure {
                service: "s".into(),
                source: DiscoveryError::Unavailable("down".into()),
            },
            GatewayError::DiscoveryTimeout {
                service: "s".into(),
                timeout_ms: 10,
            },
            GatewayError::NoRouteMatched("/".into()),
            GatewayError::Upstream("reset".into()),
        ];
        let mut codes: Vec<_> = errors.iter().map(GatewayError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_provider_failure_message_keeps_source() {
        let err = GatewayError::ProviderFailure {
            service: "orders".into(),
            source: DiscoveryError::Unavailable("registry down".into()),
        };
        assert_eq!(
            err.to_string(),
            "Instance lookup for orders failed: discovery backend unavailable: registry down"
        );
    }

    #[test]
    fn test_into_response() {
        let response = GatewayError::NoResolverConfigured("billing".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(X_GATEWAY_ERROR).unwrap(),
            "no_resolver_configured"
        );
    }
}
