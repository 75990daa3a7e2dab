//! Forwarding target reconstruction.
//!
//! # Responsibilities
//! - Point the original request URI at a chosen instance
//! - Keep path, query and user-info untouched
//! - Resolve the scheme: explicit override first, instance scheme otherwise

use axum::http::Uri;
use thiserror::Error;

use crate::discovery::ServiceInstance;

/// A forwarding target cannot be expressed as a URI.
#[derive(Debug, Error)]
#[error("cannot build forwarding target for {target}: {source}")]
pub struct InvalidTarget {
    pub target: String,
    #[source]
    pub source: axum::http::Error,
}

/// Build the forwarding URI for `instance` from the `original` request URI.
pub fn reconstruct_uri(
    instance: &ServiceInstance,
    original: &Uri,
    scheme_override: Option<&str>,
) -> Result<Uri, InvalidTarget> {
    let scheme = scheme_override
        .filter(|s| !s.is_empty())
        .unwrap_or(&instance.scheme);

    let host_port = format!("{}:{}", bracket_ipv6(&instance.host), instance.port);
    let authority = match user_info(original) {
        Some(info) => format!("{}@{}", info, host_port),
        None => host_port,
    };

    let path_and_query = original
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    Uri::builder()
        .scheme(scheme)
        .authority(authority.as_str())
        .path_and_query(path_and_query)
        .build()
        .map_err(|source| InvalidTarget {
            target: instance.to_string(),
            source,
        })
}

fn user_info(uri: &Uri) -> Option<&str> {
    uri.authority()
        .and_then(|a| a.as_str().rsplit_once('@'))
        .map(|(info, _)| info)
}

fn bracket_ipv6(host: &str) -> std::borrow::Cow<'_, str> {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host).into()
    } else {
        host.into()
    }
}
