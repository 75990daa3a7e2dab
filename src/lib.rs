//! Client-affinity API gateway library.

pub mod admin;
pub mod config;
pub mod discovery;
pub mod error;
pub mod filter;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod routing;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
