//! Config-backed instance provider.
//!
//! # Responsibilities
//! - Serve instance lists declared in the `services` config section
//! - Swap the whole table atomically on config reload

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use futures_util::future::{self, BoxFuture, FutureExt};

use crate::config::ServiceConfig;
use crate::discovery::{DiscoveryError, InstanceProvider, InstanceSnapshot, ServiceInstance};

/// Instance provider backed by statically configured lists.
#[derive(Debug)]
pub struct StaticInstanceProvider {
    services: ArcSwap<HashMap<String, InstanceSnapshot>>,
}

impl StaticInstanceProvider {
    /// Build a provider from service definitions.
    pub fn from_config(services: &[ServiceConfig]) -> Self {
        Self {
            services: ArcSwap::from_pointee(build_table(services)),
        }
    }

    /// Replace every service list at once.
    ///
    /// Requests that already fetched a snapshot keep using it.
    pub fn update(&self, services: &[ServiceConfig]) {
        let table = build_table(services);
        tracing::info!(services = table.len(), "Static instance lists updated");
        self.services.store(Arc::new(table));
    }

    /// Names of every service with a declared list.
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.load().keys().cloned().collect();
        names.sort();
        names
    }

    fn snapshot(&self, service_id: &str) -> InstanceSnapshot {
        self.services
            .load()
            .get(service_id)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }
}

impl InstanceProvider for StaticInstanceProvider {
    fn instances<'a>(
        &'a self,
        service_id: &'a str,
    ) -> BoxFuture<'a, Result<InstanceSnapshot, DiscoveryError>> {
        future::ready(Ok(self.snapshot(service_id))).boxed()
    }
}

fn build_table(services: &[ServiceConfig]) -> HashMap<String, InstanceSnapshot> {
    services
        .iter()
        .map(|service| {
            let instances: Vec<ServiceInstance> = service
                .instances
                .iter()
                .map(|i| {
                    let mut instance = ServiceInstance::new(&service.name, &i.id, &i.host, i.port)
                        .with_scheme(&i.scheme);
                    instance.metadata = i.metadata.clone();
                    instance
                })
                .collect();
            (service.name.clone(), Arc::from(instances))
        })
        .collect()
}
