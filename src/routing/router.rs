//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up matching route for request
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in priority order (acceptable for typical route counts)
//! - Explicit no-match rather than silent default

use std::sync::Arc;

use axum::http::request::Parts;

use crate::config::RouteConfig;
use crate::routing::matcher::{AndMatcher, HostMatcher, Matcher, PathPrefixMatcher};
use crate::routing::target::RouteTarget;

/// A compiled route.
#[derive(Debug)]
pub struct Route {
    pub name: String,
    pub target: RouteTarget,
    pub priority: u32,
    matcher: AndMatcher,
}

impl Route {
    pub fn matches(&self, req: &Parts) -> bool {
        self.matcher.matches(req)
    }
}

/// Priority-ordered route table.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Arc<Route>>,
}

impl Router {
    /// Compile routes from configuration. Routes with unparseable targets are skipped.
    pub fn from_config(configs: Vec<RouteConfig>) -> Self {
        let mut routes: Vec<Arc<Route>> = configs
            .into_iter()
            .filter_map(|config| {
                let Some(target) = RouteTarget::parse(&config.uri) else {
                    tracing::warn!(route = %config.name, uri = %config.uri, "Skipping route with invalid uri");
                    return None;
                };

                let mut matchers: Vec<Box<dyn Matcher>> = Vec::new();
                if let Some(host) = config.host {
                    matchers.push(Box::new(HostMatcher::new(host)));
                }
                if let Some(prefix) = config.path_prefix {
                    matchers.push(Box::new(PathPrefixMatcher::new(prefix)));
                }

                Some(Arc::new(Route {
                    name: config.name,
                    target,
                    priority: config.priority,
                    matcher: AndMatcher::new(matchers),
                }))
            })
            .collect();

        // Stable sort keeps declaration order among equal priorities.
        routes.sort_by(|a, b| b.priority.cmp(&a.priority));

        tracing::debug!(routes = routes.len(), "Route table compiled");
        Self { routes }
    }

    /// First route (by priority) matching the request.
    pub fn match_request(&self, req: &Parts) -> Option<Arc<Route>> {
        self.routes.iter().find(|r| r.matches(req)).cloned()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
