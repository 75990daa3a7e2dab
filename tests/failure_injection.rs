//! Failure injection: discovery outages, slow discovery, dead upstreams.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use futures_util::future::{self, BoxFuture, FutureExt};
use sticky_gateway::config::{GatewayConfig, ServiceConfig};
use sticky_gateway::discovery::{DiscoveryError, InstanceProvider, InstanceSnapshot, ServiceInstance};

mod common;

fn addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

fn config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.affinity.services = vec!["orders".into()];
    config.routes.push(common::route("orders", "/orders", "iphash://orders"));
    config
}

/// Fails until `failures` calls have been made, then serves `instances`.
#[derive(Debug)]
struct FlakyProvider {
    failures: u32,
    calls: AtomicU32,
    instances: InstanceSnapshot,
}

impl InstanceProvider for FlakyProvider {
    fn instances<'a>(&'a self, _service_id: &'a str) -> BoxFuture<'a, Result<InstanceSnapshot, DiscoveryError>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let result = if call < self.failures {
            Err(DiscoveryError::Unavailable("registry unreachable".into()))
        } else {
            Ok(self.instances.clone())
        };
        future::ready(result).boxed()
    }
}

#[derive(Debug)]
struct StalledProvider;

impl InstanceProvider for StalledProvider {
    fn instances<'a>(&'a self, _service_id: &'a str) -> BoxFuture<'a, Result<InstanceSnapshot, DiscoveryError>> {
        future::pending().boxed()
    }
}

#[tokio::test]
async fn test_provider_failure_is_bad_gateway_and_not_retried() {
    let backend = addr(28501);
    common::start_named_backend(backend, "A").await;

    let provider = Arc::new(FlakyProvider {
        failures: 1,
        calls: AtomicU32::new(0),
        instances: Arc::from(vec![ServiceInstance::new(
            "orders",
            "A",
            backend.ip().to_string(),
            backend.port(),
        )]),
    });
    let gateway = common::start_gateway_with_provider(addr(28500), config(), provider.clone()).await;
    let client = common::client();

    let res = client.get(gateway.url("/orders")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(res.headers().get("x-gateway-error").unwrap(), "provider_failure");
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    // The next request sees the recovered provider.
    let res = client.get(gateway.url("/orders")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "A /orders");

    gateway.stop();
}

#[tokio::test]
async fn test_stalled_discovery_times_out() {
    let mut config = config();
    config.affinity.discovery_timeout_ms = 100;
    let gateway = common::start_gateway_with_provider(addr(28510), config, Arc::new(StalledProvider)).await;

    let res = common::client().get(gateway.url("/orders")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(res.headers().get("x-gateway-error").unwrap(), "discovery_timeout");

    gateway.stop();
}

#[tokio::test]
async fn test_dead_instance_is_upstream_failure() {
    // Nothing listens on the instance port.
    let mut config = config();
    config.services.push(ServiceConfig {
        name: "orders".into(),
        instances: vec![common::instance("A", addr(28521))],
    });
    let gateway = common::start_gateway(addr(28520), config).await;

    let res = common::client().get(gateway.url("/orders")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(res.headers().get("x-gateway-error").unwrap(), "upstream_failure");

    gateway.stop();
}
