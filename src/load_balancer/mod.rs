//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Interceptor asks for service X with client key K
//!     → registry.rs (balancer bound to X, or none)
//!     → ip_hash.rs (fetch snapshot, select by hash.rs)
//!     → uri.rs (point the request URI at the chosen instance)
//! ```
//!
//! # Design Decisions
//! - Selection is a pure function of (client key, ordered snapshot)
//! - FNV-1a instead of a runtime-defined hash: stable across processes
//! - Balancers hold no pool state; every choice reads a fresh snapshot
//! - Affinity holds only while pool membership and order are unchanged

pub mod hash;
pub mod ip_hash;
pub mod registry;
pub mod uri;

pub use ip_hash::{select, IpHashLoadBalancer};
pub use registry::LoadBalancerRegistry;
pub use uri::{reconstruct_uri, InvalidTarget};
