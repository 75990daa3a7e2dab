use std::time::Duration;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::discovery::ServiceInstance;
use crate::error::{GatewayError, GatewayResult};
use crate::filter::normalize_client_key;
use crate::http::server::AppState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub routes: usize,
    pub bound_services: Vec<String>,
    pub filters: Vec<&'static str>,
}

#[derive(Serialize)]
pub struct ServiceStatus {
    pub service: String,
    /// Set when the instance lookup failed; `instances` is then empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub instances: Vec<ServiceInstance>,
}

#[derive(Deserialize)]
pub struct ResolveQuery {
    pub service: String,
    pub client: String,
}

#[derive(Serialize)]
pub struct Resolution {
    pub service: String,
    pub client: String,
    pub pool_size: usize,
    pub instance: ServiceInstance,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let inner = state.inner.load_full();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        routes: inner.router.len(),
        bound_services: inner.registry.services().into_iter().map(str::to_string).collect(),
        filters: inner.chain.names(),
    })
}

/// Bound services with their current instance snapshot.
pub async fn get_services(State(state): State<AppState>) -> Json<Vec<ServiceStatus>> {
    let inner = state.inner.load_full();
    let mut statuses = Vec::new();

    for service in inner.registry.services() {
        let status = match inner.provider.instances(service).await {
            Ok(snapshot) => ServiceStatus {
                service: service.to_string(),
                error: None,
                instances: snapshot.to_vec(),
            },
            Err(e) => ServiceStatus {
                service: service.to_string(),
                error: Some(e.to_string()),
                instances: Vec::new(),
            },
        };
        statuses.push(status);
    }

    Json(statuses)
}

/// Preview which instance a client key maps to, without forwarding anything.
///
/// Address keys are normalized the same way the interceptor does it; other
/// values are hashed verbatim.
pub async fn resolve(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
) -> GatewayResult<Json<Resolution>> {
    let inner = state.inner.load_full();

    if inner.registry.get(&query.service).is_none() {
        return Err(GatewayError::NoResolverConfigured(query.service));
    }

    let timeout_ms = inner.config.affinity.discovery_timeout_ms;
    let pool = tokio::time::timeout(
        Duration::from_millis(timeout_ms),
        inner.provider.instances(&query.service),
    )
    .await
    .map_err(|_| GatewayError::DiscoveryTimeout {
        service: query.service.clone(),
        timeout_ms,
    })?
    .map_err(|source| GatewayError::ProviderFailure {
        service: query.service.clone(),
        source,
    })?;

    let client = normalize_client_key(&query.client).unwrap_or_else(|| query.client.clone());
    let instance = crate::load_balancer::select(&client, &pool)
        .cloned()
        .ok_or_else(|| GatewayError::no_instance(query.service.clone(), inner.config.affinity.use_404))?;

    Ok(Json(Resolution {
        service: query.service,
        client,
        pool_size: pool.len(),
        instance,
    }))
}
