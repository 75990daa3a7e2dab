//! Route target → request URL.

use axum::http::Uri;
use futures_util::future::{BoxFuture, FutureExt};

use crate::error::GatewayError;
use crate::filter::{Exchange, GatewayFilter};
use crate::load_balancer::InvalidTarget;

pub const ROUTE_TO_URL_FILTER_ORDER: i32 = 10000;

/// Seeds the request URL from the matched route: scheme and authority from the
/// route target, path and query from the inbound request. Also copies the
/// route's scheme prefix onto the exchange.
#[derive(Debug, Default)]
pub struct RouteToRequestUrlFilter;

impl RouteToRequestUrlFilter {
    pub fn new() -> Self {
        Self
    }

    fn apply(&self, exchange: &mut Exchange) -> Result<(), GatewayError> {
        let Some(route) = exchange.route().cloned() else {
            return Ok(());
        };

        let target = &route.target.uri;
        let path_and_query = exchange
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let mut builder = Uri::builder();
        if let Some(scheme) = target.scheme() {
            builder = builder.scheme(scheme.as_str());
        }
        if let Some(authority) = target.authority() {
            builder = builder.authority(authority.as_str());
        }
        let url = builder
            .path_and_query(path_and_query)
            .build()
            .map_err(|source| InvalidTarget {
                target: route.name.clone(),
                source,
            })?;

        tracing::trace!(
            request_id = %exchange.request_id(),
            route = %route.name,
            url = %url,
            "Request URL resolved from route"
        );

        exchange.set_scheme_prefix(route.target.scheme_prefix.clone());
        exchange.set_request_url(url);
        Ok(())
    }
}

impl GatewayFilter for RouteToRequestUrlFilter {
    fn name(&self) -> &'static str {
        "route_to_request_url"
    }

    fn order(&self) -> i32 {
        ROUTE_TO_URL_FILTER_ORDER
    }

    fn filter<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), GatewayError>> {
        async move { self.apply(exchange) }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;
    use crate::routing::Router;
    use axum::http::{Method, Request};

    fn exchange_for(route_uri: &str, request_uri: &str) -> Exchange {
        let router = Router::from_config(vec![RouteConfig {
            name: "r".into(),
            host: None,
            path_prefix: None,
            uri: route_uri.into(),
            priority: 0,
        }]);
        let parts = Request::builder().uri(request_uri).body(()).unwrap().into_parts().0;
        let route = router.match_request(&parts).unwrap();
        Exchange::new("req", Method::GET, parts.uri, "10.0.0.5:1234".parse().unwrap()).with_route(route)
    }

    #[test]
    fn test_balanced_route() {
        let mut ex = exchange_for("iphash://orders", "/orders/1?x=1");
        RouteToRequestUrlFilter::new().apply(&mut ex).unwrap();

        assert_eq!(ex.request_url().unwrap().to_string(), "iphash://orders/orders/1?x=1");
        assert_eq!(ex.scheme_prefix(), None);
    }

    #[test]
    fn test_prefixed_route() {
        let mut ex = exchange_for("iphash:https://orders", "/a");
        RouteToRequestUrlFilter::new().apply(&mut ex).unwrap();

        assert_eq!(ex.request_url().unwrap().to_string(), "https://orders/a");
        assert_eq!(ex.scheme_prefix(), Some("iphash"));
    }

    #[test]
    fn test_no_route_leaves_exchange_alone() {
        let mut ex = Exchange::new("req", Method::GET, Uri::from_static("/a"), "10.0.0.5:1234".parse().unwrap());
        RouteToRequestUrlFilter::new().apply(&mut ex).unwrap();
        assert!(ex.request_url().is_none());
    }
}
