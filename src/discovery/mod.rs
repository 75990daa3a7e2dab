//! Service discovery boundary.
//!
//! # Data Flow
//! ```text
//! Logical service name
//!     → InstanceProvider::instances (may suspend)
//!     → InstanceSnapshot (ordered, read-only)
//!     → load_balancer (pure selection)
//! ```
//!
//! # Design Decisions
//! - The gateway never owns the registry; it only consumes snapshots
//! - Every fetch returns a fresh, independent snapshot (no caching here)
//! - Provider failures are errors, never an empty pool

pub mod static_list;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;

pub use static_list::StaticInstanceProvider;

/// A single registered backend instance of a logical service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInstance {
    /// Instance identifier, unique within its service.
    pub instance_id: String,
    /// Logical service this instance is registered under.
    pub service_id: String,
    /// Host name or IP literal.
    pub host: String,
    pub port: u16,
    /// Native scheme of the instance (`http`, `https`, ...).
    pub scheme: String,
    pub secure: bool,
    /// Opaque registry metadata.
    pub metadata: BTreeMap<String, String>,
}

impl ServiceInstance {
    pub fn new(
        service_id: impl Into<String>,
        instance_id: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            service_id: service_id.into(),
            host: host.into(),
            port,
            scheme: "http".to_string(),
            secure: false,
            metadata: BTreeMap::new(),
        }
    }

    /// Replace the native scheme; `https` marks the instance secure.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self.secure = self.scheme.eq_ignore_ascii_case("https");
        self
    }
}

impl fmt::Display for ServiceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}:{}]", self.instance_id, self.host, self.port)
    }
}

/// Ordered instance list for one service, observed at one point in time.
pub type InstanceSnapshot = Arc<[ServiceInstance]>;

/// Errors raised by a discovery backend while fetching a snapshot.
#[derive(Debug, Clone, Error)]
pub enum DiscoveryError {
    /// The registry could not be reached.
    #[error("discovery backend unavailable: {0}")]
    Unavailable(String),

    /// The registry answered with something unusable.
    #[error("invalid discovery response: {0}")]
    InvalidResponse(String),
}

/// Supplies the current instance pool of a logical service.
///
/// Implementations may return a different snapshot on every call, including an
/// empty one. The returned future is owned by the calling request: dropping it
/// must release anything the fetch holds.
pub trait InstanceProvider: Send + Sync + fmt::Debug {
    fn instances<'a>(
        &'a self,
        service_id: &'a str,
    ) -> BoxFuture<'a, Result<InstanceSnapshot, DiscoveryError>>;
}
