//! HTTP server setup and request forwarding.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler
//! - Wire up middleware (request ID, tracing, timeout)
//! - Dispatch requests to routing and the filter chain
//! - Forward requests to the resolved upstream URL
//! - Swap gateway state on config reload

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Request, Version},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::discovery::{InstanceProvider, StaticInstanceProvider};
use crate::error::GatewayError;
use crate::filter::{Exchange, FilterChain, GatewayFilter, IpHashFilter, RouteToRequestUrlFilter};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::strip_hop_by_hop;
use crate::load_balancer::LoadBalancerRegistry;
use crate::observability::metrics;
use crate::routing::Router as ProxyRouter;

/// Everything derived from one configuration generation.
#[derive(Debug)]
pub struct GatewayState {
    pub config: GatewayConfig,
    pub router: ProxyRouter,
    pub registry: Arc<LoadBalancerRegistry>,
    pub provider: Arc<dyn InstanceProvider>,
    pub chain: FilterChain,
}

impl GatewayState {
    pub fn build(config: GatewayConfig, provider: Arc<dyn InstanceProvider>) -> Self {
        let router = ProxyRouter::from_config(config.routes.clone());
        let registry = Arc::new(LoadBalancerRegistry::new(
            config.affinity.services.iter().cloned(),
            provider.clone(),
        ));

        let filters: Vec<Arc<dyn GatewayFilter>> = vec![
            Arc::new(RouteToRequestUrlFilter::new()),
            Arc::new(IpHashFilter::new(&config.affinity, registry.clone())),
        ];

        Self {
            config,
            router,
            registry,
            provider,
            chain: FilterChain::new(filters),
        }
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<GatewayState>>,
    pub client: Client<HttpConnector, Body>,
}

/// Where instance lists come from.
enum Discovery {
    /// The `services` config section; refreshed on reload.
    Static(Arc<StaticInstanceProvider>),
    /// Supplied by the embedding application; untouched on reload.
    External(Arc<dyn InstanceProvider>),
}

impl Discovery {
    fn provider(&self) -> Arc<dyn InstanceProvider> {
        match self {
            Discovery::Static(p) => p.clone(),
            Discovery::External(p) => p.clone(),
        }
    }

    fn reload(&self, config: &GatewayConfig) {
        if let Discovery::Static(p) = self {
            p.update(&config.services);
        }
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    state: AppState,
    discovery: Discovery,
    request_timeout: Duration,
}

impl HttpServer {
    /// Create a server whose instance lists come from the config file.
    pub fn new(config: GatewayConfig) -> Self {
        let provider = Arc::new(StaticInstanceProvider::from_config(&config.services));
        tracing::info!(services = ?provider.service_names(), "Static instance lists loaded");
        Self::build(config, Discovery::Static(provider))
    }

    /// Create a server backed by an external instance provider.
    pub fn with_provider(config: GatewayConfig, provider: Arc<dyn InstanceProvider>) -> Self {
        Self::build(config, Discovery::External(provider))
    }

    fn build(config: GatewayConfig, discovery: Discovery) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let request_timeout = Duration::from_secs(config.timeouts.request_secs);
        let gateway = GatewayState::build(config, discovery.provider());

        tracing::info!(
            routes = gateway.router.len(),
            bound_services = ?gateway.registry.services(),
            filters = ?gateway.chain.names(),
            "Gateway state initialized"
        );

        Self {
            state: AppState {
                inner: Arc::new(ArcSwap::from_pointee(gateway)),
                client,
            },
            discovery,
            request_timeout,
        }
    }

    /// Shared state, e.g. for the admin API.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(self.state.clone())
            .layer(TimeoutLayer::new(self.request_timeout))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Serve until `shutdown` fires, applying config updates as they arrive.
    ///
    /// Listener address and request timeout are fixed at startup; everything else
    /// (routes, bindings, affinity settings, static instances) follows reloads.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router().into_make_service_with_connect_info::<SocketAddr>();

        let inner = self.state.inner.clone();
        let discovery = self.discovery;
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                discovery.reload(&config);
                let gateway = GatewayState::build(config, discovery.provider());
                tracing::info!(
                    routes = gateway.router.len(),
                    bound_services = ?gateway.registry.services(),
                    "Configuration reloaded"
                );
                inner.store(Arc::new(gateway));
            }
        });

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Matches a route, runs the filter chain, and forwards to the resolved URL.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let gateway = state.inner.load_full();
    let (mut parts, body) = request.into_parts();

    let request_id = request_id(&parts.headers).to_string();
    let method = parts.method.to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %parts.uri.path(),
        client = %remote_addr,
        "Proxying request"
    );

    // 1. Match Route
    let Some(route) = gateway.router.match_request(&parts) else {
        tracing::warn!(request_id = %request_id, path = %parts.uri.path(), "No route matched");
        metrics::record_request(&method, 404, "none", start_time);
        return GatewayError::NoRouteMatched(parts.uri.path().to_string()).into_response();
    };

    // 2. Resolve the forwarding target
    let mut exchange = Exchange::new(request_id.clone(), parts.method.clone(), parts.uri.clone(), remote_addr)
        .with_headers(&parts.headers)
        .with_route(route);

    if let Err(e) = gateway.chain.run(&mut exchange).await {
        tracing::warn!(
            request_id = %request_id,
            code = e.code(),
            error = %e,
            "Request failed before forwarding"
        );
        metrics::record_request(&method, e.status().as_u16(), "none", start_time);
        return e.into_response();
    }

    let Some(target) = exchange.request_url().cloned() else {
        metrics::record_request(&method, 404, "none", start_time);
        return GatewayError::NoRouteMatched(parts.uri.path().to_string()).into_response();
    };
    drop(exchange);

    // 3. Forward
    let target_label = target.authority().map(|a| a.to_string()).unwrap_or_default();

    strip_hop_by_hop(&mut parts.headers);
    parts.headers.remove(header::HOST);
    parts.uri = target;
    parts.version = Version::HTTP_11;

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let status = response.status();
            metrics::record_request(&method, status.as_u16(), &target_label, start_time);

            let (mut parts, body) = response.into_parts();
            strip_hop_by_hop(&mut parts.headers);
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, target = %target_label, error = %e, "Upstream error");
            metrics::record_request(&method, 502, &target_label, start_time);
            GatewayError::Upstream(e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InstanceConfig, RouteConfig, ServiceConfig};
    use crate::error::X_GATEWAY_ERROR;
    use crate::http::X_REQUEST_ID;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn config(instances: Vec<InstanceConfig>, bound: &[&str]) -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.affinity.services = bound.iter().map(|s| s.to_string()).collect();
        config.routes.push(RouteConfig {
            name: "orders".into(),
            host: None,
            path_prefix: Some("/orders".into()),
            uri: "iphash://orders".into(),
            priority: 0,
        });
        config.services.push(ServiceConfig {
            name: "orders".into(),
            instances,
        });
        config
    }

    fn app(config: GatewayConfig) -> Router {
        HttpServer::new(config)
            .router()
            .layer(MockConnectInfo(SocketAddr::from(([10, 0, 0, 5], 40000))))
    }

    async fn call(app: Router, path: &str) -> Response {
        app.oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_no_route() {
        let response = call(app(config(vec![], &["orders"])), "/inventory").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers().get(X_GATEWAY_ERROR).unwrap(), "no_route");
        assert!(response.headers().contains_key(X_REQUEST_ID));
    }

    #[tokio::test]
    async fn test_empty_pool_is_not_found() {
        let response = call(app(config(vec![], &["orders"])), "/orders/1").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(X_GATEWAY_ERROR).unwrap(),
            "no_instance_available"
        );
    }

    #[tokio::test]
    async fn test_unbound_service_is_server_error() {
        let instances = vec![InstanceConfig {
            id: "orders-1".into(),
            host: "127.0.0.1".into(),
            port: 9,
            scheme: "http".into(),
            metadata: Default::default(),
        }];
        let response = call(app(config(instances, &[])), "/orders/1").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(X_GATEWAY_ERROR).unwrap(),
            "no_resolver_configured"
        );
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let response = app(config(vec![], &["orders"]))
            .oneshot(
                Request::builder()
                    .uri("/inventory")
                    .header(X_REQUEST_ID, "fixed-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers().get(X_REQUEST_ID).unwrap(), "fixed-id");
    }

    #[tokio::test]
    async fn test_reload_swaps_state() {
        let server = HttpServer::new(config(vec![], &["orders"]));
        let state = server.state();
        assert!(state.inner.load().registry.get("orders").is_some());

        let mut next = config(vec![], &["billing"]);
        next.affinity.use_404 = false;
        server.discovery.reload(&next);
        state
            .inner
            .store(Arc::new(GatewayState::build(next, server.discovery.provider())));

        let gateway = state.inner.load();
        assert!(gateway.registry.get("orders").is_none());
        assert!(gateway.registry.get("billing").is_some());
        assert!(!gateway.config.affinity.use_404);
    }
}
