//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, trace layers)
//!     → routing (match route)
//!     → filter chain (resolve request URL, IP hash selection)
//!     → server.rs forwarder (hyper client, streaming)
//!     → response.rs (strip hop-by-hop headers)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, GatewayState, HttpServer};
