//! IP hash load balancing strategy.

use std::fmt;
use std::sync::Arc;

use crate::discovery::{DiscoveryError, InstanceProvider, ServiceInstance};
use crate::load_balancer::hash::{fnv1a_32, index_for_hash};
use crate::observability::metrics;

/// Pick the instance for `client_key` from `pool`.
///
/// Pure: the same key and the same ordered pool always give the same instance.
/// An empty pool gives `None`.
pub fn select<'a>(client_key: &str, pool: &'a [ServiceInstance]) -> Option<&'a ServiceInstance> {
    let index = index_for_hash(fnv1a_32(client_key.as_bytes()), pool.len())?;
    pool.get(index)
}

/// Client-affinity balancer bound to one logical service.
///
/// Holds its provider explicitly and fetches a fresh snapshot for every choice.
pub struct IpHashLoadBalancer {
    service_id: String,
    provider: Arc<dyn InstanceProvider>,
}

impl IpHashLoadBalancer {
    pub fn new(service_id: impl Into<String>, provider: Arc<dyn InstanceProvider>) -> Self {
        Self {
            service_id: service_id.into(),
            provider,
        }
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Choose the instance for `client_key` from the current pool.
    ///
    /// `Ok(None)` means the pool was empty. Provider errors are returned as-is.
    pub async fn choose(&self, client_key: &str) -> Result<Option<ServiceInstance>, DiscoveryError> {
        let snapshot = self.provider.instances(&self.service_id).await?;
        metrics::record_pool_size(&self.service_id, snapshot.len());

        let chosen = select(client_key, &snapshot).cloned();
        if chosen.is_none() {
            tracing::warn!(service = %self.service_id, "No servers available for service");
        }
        Ok(chosen)
    }
}

impl fmt::Debug for IpHashLoadBalancer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IpHashLoadBalancer")
            .field("service_id", &self.service_id)
            .finish_non_exhaustive()
    }
}
