//! Route target URIs.
//!
//! A route points either at a concrete address or at a logical service through a
//! balancing scheme:
//!
//! ```text
//! http://10.0.0.9:8080       direct, no prefix
//! iphash://orders            balanced, instance scheme used
//! iphash:https://orders      balanced, scheme prefix "iphash", override "https"
//! ```

use axum::http::Uri;

use crate::config::validation::is_scheme;

/// Parsed route target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    /// Scheme prefix in front of a nested URI, if any.
    pub scheme_prefix: Option<String>,
    /// Absolute target URI (scheme and authority always present).
    pub uri: Uri,
}

impl RouteTarget {
    /// Parse a route URI. Returns `None` unless the result has a scheme and an authority.
    pub fn parse(raw: &str) -> Option<Self> {
        let (scheme, rest) = raw.split_once(':')?;
        if !is_scheme(scheme) {
            return None;
        }

        if !rest.starts_with("//") && has_scheme(rest) {
            return Some(Self {
                scheme_prefix: Some(scheme.to_string()),
                uri: absolute(rest)?,
            });
        }

        Some(Self {
            scheme_prefix: None,
            uri: absolute(raw)?,
        })
    }
}

fn has_scheme(s: &str) -> bool {
    s.split_once(':').is_some_and(|(scheme, _)| is_scheme(scheme))
}

fn absolute(raw: &str) -> Option<Uri> {
    let uri: Uri = raw.parse().ok()?;
    uri.scheme()?;
    uri.authority()?;
    Some(uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_balanced_target() {
        let target = RouteTarget::parse("iphash://orders").unwrap();
        assert_eq!(target.scheme_prefix, None);
        assert_eq!(target.uri.scheme_str(), Some("iphash"));
        assert_eq!(target.uri.host(), Some("orders"));
    }

    #[test]
    fn test_prefixed_target() {
        let target = RouteTarget::parse("iphash:https://orders").unwrap();
        assert_eq!(target.scheme_prefix.as_deref(), Some("iphash"));
        assert_eq!(target.uri.scheme_str(), Some("https"));
        assert_eq!(target.uri.host(), Some("orders"));
    }

    #[test]
    fn test_direct_target() {
        let target = RouteTarget::parse("http://10.0.0.9:8080").unwrap();
        assert_eq!(target.scheme_prefix, None);
        assert_eq!(target.uri.port_u16(), Some(8080));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(RouteTarget::parse("").is_none());
        assert!(RouteTarget::parse("::::").is_none());
        assert!(RouteTarget::parse("orders").is_none());
        assert!(RouteTarget::parse("iphash:").is_none());
        assert!(RouteTarget::parse("/just/a/path").is_none());
    }
}
