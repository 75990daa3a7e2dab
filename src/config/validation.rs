//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Detect duplicate names and unparseable targets
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::routing::target::RouteTarget;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address for {field}: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("affinity scheme {0:?} is not a valid URI scheme")]
    InvalidAffinityScheme(String),

    #[error("duplicate route name: {0}")]
    DuplicateRoute(String),

    #[error("route {route}: invalid uri {uri:?}")]
    InvalidRouteUri { route: String, uri: String },

    #[error("duplicate service definition: {0}")]
    DuplicateService(String),

    #[error("service {0} is bound more than once")]
    DuplicateBinding(String),

    #[error("service {service}: duplicate instance id {instance}")]
    DuplicateInstance { service: String, instance: String },

    #[error("service {service}: instance {instance} has {reason}")]
    InvalidInstance {
        service: String,
        instance: String,
        reason: &'static str,
    },

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("admin API is enabled without an API key")]
    MissingAdminKey,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.trim().is_empty() {
            errors.push(ValidationError::MissingAdminKey);
        }
    }

    if !is_scheme(&config.affinity.scheme) {
        errors.push(ValidationError::InvalidAffinityScheme(config.affinity.scheme.clone()));
    }

    let mut bound = HashSet::new();
    for service in &config.affinity.services {
        if !bound.insert(service.as_str()) {
            errors.push(ValidationError::DuplicateBinding(service.clone()));
        }
    }

    let mut route_names = HashSet::new();
    for route in &config.routes {
        if !route_names.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }
        if RouteTarget::parse(&route.uri).is_none() {
            errors.push(ValidationError::InvalidRouteUri {
                route: route.name.clone(),
                uri: route.uri.clone(),
            });
        }
    }

    let mut service_names = HashSet::new();
    for service in &config.services {
        if !service_names.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }
        let mut ids = HashSet::new();
        for instance in &service.instances {
            if !ids.insert(instance.id.as_str()) {
                errors.push(ValidationError::DuplicateInstance {
                    service: service.name.clone(),
                    instance: instance.id.clone(),
                });
            }
            let problem = if instance.host.trim().is_empty() {
                Some("an empty host")
            } else if instance.port == 0 {
                Some("port 0")
            } else if !is_scheme(&instance.scheme) {
                Some("an invalid scheme")
            } else {
                None
            };
            if let Some(reason) = problem {
                errors.push(ValidationError::InvalidInstance {
                    service: service.name.clone(),
                    instance: instance.id.clone(),
                    reason,
                });
            }
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.request_secs"));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.connect_secs"));
    }
    if config.affinity.discovery_timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout("affinity.discovery_timeout_ms"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

/// RFC 3986 scheme: ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )
pub(crate) fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
