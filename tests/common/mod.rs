//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use sticky_gateway::config::{GatewayConfig, InstanceConfig, RouteConfig};
use sticky_gateway::discovery::InstanceProvider;
use sticky_gateway::http::HttpServer;
use sticky_gateway::lifecycle::Shutdown;

/// Start a mock backend that answers `<name> <request path>` to every request.
pub async fn start_named_backend(addr: SocketAddr, name: &'static str) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 8192];
                        let mut read = 0;
                        while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") && read < buf.len() {
                            match socket.read(&mut buf[read..]).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => read += n,
                            }
                        }
                        let head = String::from_utf8_lossy(&buf[..read]);
                        let path = head
                            .lines()
                            .next()
                            .and_then(|line| line.split_whitespace().nth(1))
                            .unwrap_or("?")
                            .to_string();

                        let body = format!("{} {}", name, path);
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

pub fn instance(id: &str, addr: SocketAddr) -> InstanceConfig {
    InstanceConfig {
        id: id.to_string(),
        host: addr.ip().to_string(),
        port: addr.port(),
        scheme: "http".into(),
        metadata: Default::default(),
    }
}

pub fn route(name: &str, path_prefix: &str, uri: &str) -> RouteConfig {
    RouteConfig {
        name: name.to_string(),
        host: None,
        path_prefix: Some(path_prefix.to_string()),
        uri: uri.to_string(),
        priority: 0,
    }
}

/// A running gateway; dropping it does not stop the server, call `stop`.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub config_updates: mpsc::UnboundedSender<GatewayConfig>,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn stop(&self) {
        self.shutdown.trigger();
    }
}

/// Start a gateway on `addr` backed by the config's static instance lists.
pub async fn start_gateway(addr: SocketAddr, config: GatewayConfig) -> TestGateway {
    spawn(addr, HttpServer::new(config)).await
}

/// Start a gateway on `addr` backed by an external provider.
pub async fn start_gateway_with_provider(
    addr: SocketAddr,
    config: GatewayConfig,
    provider: Arc<dyn InstanceProvider>,
) -> TestGateway {
    spawn(addr, HttpServer::with_provider(config, provider)).await
}

async fn spawn(addr: SocketAddr, server: HttpServer) -> TestGateway {
    let shutdown = Shutdown::new();
    let (tx, config_updates) = mpsc::unbounded_channel();
    let listener = TcpListener::bind(addr).await.unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(200)).await;

    TestGateway {
        addr,
        shutdown,
        config_updates: tx,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
