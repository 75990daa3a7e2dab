//! Per-service balancer bindings.
//!
//! # Responsibilities
//! - Bind an IP hash balancer to every configured logical service
//! - Answer "which balancer serves this service?" for the interceptor

use std::collections::HashMap;
use std::sync::Arc;

use crate::discovery::InstanceProvider;
use crate::load_balancer::ip_hash::IpHashLoadBalancer;

/// Immutable map of service name -> bound balancer.
#[derive(Debug, Default)]
pub struct LoadBalancerRegistry {
    balancers: HashMap<String, Arc<IpHashLoadBalancer>>,
}

impl LoadBalancerRegistry {
    /// Bind a balancer to each service in `services`, all sharing `provider`.
    pub fn new<I, S>(services: I, provider: Arc<dyn InstanceProvider>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let balancers = services
            .into_iter()
            .map(|name| {
                let name = name.into();
                let lb = Arc::new(IpHashLoadBalancer::new(name.clone(), provider.clone()));
                (name, lb)
            })
            .collect::<HashMap<_, _>>();

        tracing::debug!(bound = balancers.len(), "Load balancer registry built");
        Self { balancers }
    }

    /// Balancer bound to `service_id`, if any.
    pub fn get(&self, service_id: &str) -> Option<Arc<IpHashLoadBalancer>> {
        self.balancers.get(service_id).cloned()
    }

    /// Bound service names, sorted.
    pub fn services(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.balancers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
