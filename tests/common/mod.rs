//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use forward_proxy::config::ProxyConfig;
use forward_proxy::net::listener::Listener;
use forward_proxy::observability::AccessLog;
use forward_proxy::proxy::Credential;
use forward_proxy::{ProxyServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

pub const USERNAME: &str = "tester";
pub const PASSWORD: &str = "s3cret";
pub const REALM: &str = "Test Proxy";

/// A proxy running in the background of the current test runtime.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub task: tokio::task::JoinHandle<()>,
}

pub fn test_config() -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.auth.username = USERNAME.into();
    config.auth.password = PASSWORD.into();
    config.auth.realm = REALM.into();
    config.access_log.console = false;
    config.proxy.drain_timeout_secs = 1;
    config
}

/// Start a proxy with `config`, logging to `log_path` when given.
pub async fn start_proxy_with(config: ProxyConfig, log_path: Option<&Path>) -> TestProxy {
    let access_log = match log_path {
        Some(path) => AccessLog::open(path, false).await.unwrap(),
        None => AccessLog::disabled(),
    };
    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let server = ProxyServer::from_config(&config, Arc::new(access_log));
    let task = tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });

    TestProxy {
        addr,
        shutdown,
        task,
    }
}

pub async fn start_proxy() -> TestProxy {
    start_proxy_with(test_config(), None).await
}

pub fn auth_header() -> String {
    format!(
        "Proxy-Authorization: {}\r\n",
        Credential::new(USERNAME, PASSWORD).basic_header_value()
    )
}

/// Send `request` to the proxy and return everything it writes back before closing.
pub async fn round_trip(proxy: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut client = TcpStream::connect(proxy).await.unwrap();
    client.write_all(request).await.unwrap();
    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), client.read_to_end(&mut response))
        .await
        .expect("proxy did not close the connection")
        .unwrap();
    response
}

/// Start an origin that echoes every byte back until the peer closes.
pub async fn start_echo_origin() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = socket.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });

    addr
}

/// An origin that captures the first request it receives and replies with a
/// fixed response before closing.
pub struct CaptureOrigin {
    pub addr: SocketAddr,
    pub requests: mpsc::UnboundedReceiver<Vec<u8>>,
    pub accepted: Arc<AtomicUsize>,
}

impl CaptureOrigin {
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

pub async fn start_capture_origin(response: &'static [u8]) -> CaptureOrigin {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, requests) = mpsc::unbounded_channel();
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&accepted);
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = tx.send(request);
                let _ = socket.write_all(response).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    CaptureOrigin {
        addr,
        requests,
        accepted,
    }
}

/// A local port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}
