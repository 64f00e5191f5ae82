//! Common test utilities: in-process member status servers

#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::stream;
use reqwest::Client;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tidbctl_common::MemberRole;
use tidbctl_controller::config::{ProbeConfig, StatusEndpoint};
use tidbctl_controller::health::{peer_service_name, pod_name};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// How a member's status endpoint answers
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Healthy,
    Slow(Duration),
    Status(StatusCode),
    /// 200 whose body stream fails after the first chunk
    BrokenBody,
}

#[derive(Default)]
struct StatusState {
    behaviors: HashMap<String, Behavior>,
    hits: Mutex<Vec<String>>,
}

/// Status server standing in for every member pod of a cluster.
///
/// Requests are told apart by their Host header, which carries the pod's
/// peer DNS name.
pub struct StatusServer {
    pub addr: SocketAddr,
    state: Arc<StatusState>,
    handle: JoinHandle<()>,
}

impl StatusServer {
    pub async fn start(behaviors: HashMap<String, Behavior>) -> Self {
        let state = Arc::new(StatusState {
            behaviors,
            hits: Mutex::new(Vec::new()),
        });

        let router = Router::new()
            .route("/status", get(status))
            .with_state(state.clone());

        let (addr, handle) = serve(router).await;
        Self {
            addr,
            state,
            handle,
        }
    }

    /// Pods that received a request, in arrival order
    pub fn hits(&self) -> Vec<String> {
        self.state.hits.lock().unwrap().clone()
    }

    /// Stop accepting connections
    pub async fn stop(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}

async fn status(State(state): State<Arc<StatusState>>, headers: HeaderMap) -> Response {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let pod = host.split('.').next().unwrap_or_default().to_string();

    state.hits.lock().unwrap().push(pod.clone());

    match state.behaviors.get(&pod).copied().unwrap_or(Behavior::Healthy) {
        Behavior::Healthy => (StatusCode::OK, r#"{"connections":0,"version":"test"}"#).into_response(),
        Behavior::Slow(delay) => {
            tokio::time::sleep(delay).await;
            (StatusCode::OK, "late").into_response()
        }
        Behavior::Status(code) => (code, "unhealthy").into_response(),
        Behavior::BrokenBody => {
            let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
                Ok(Bytes::from_static(b"{\"connections\":")),
                Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "status writer failed")),
            ];
            (StatusCode::OK, Body::from_stream(stream::iter(chunks))).into_response()
        }
    }
}

/// Serve a router on an ephemeral loopback port
pub async fn serve(router: Router) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (addr, handle)
}

/// HTTP client resolving every member's peer DNS name to `addr`
pub fn member_client(
    namespace: &str,
    cluster: &str,
    role: MemberRole,
    replicas: u32,
    addr: SocketAddr,
) -> Client {
    let mut builder = Client::builder();
    for ordinal in 0..replicas {
        let host = format!(
            "{}.{}.{}",
            pod_name(cluster, role, ordinal),
            peer_service_name(cluster, role),
            namespace
        );
        builder = builder.resolve(&host, addr);
    }
    builder.build().expect("Failed to create HTTP client")
}

/// Probe configuration pointing the role's status port at `addr`
pub fn probe_config(role: MemberRole, addr: SocketAddr, timeout_secs: u64) -> ProbeConfig {
    let mut config = ProbeConfig {
        timeout_secs,
        ..Default::default()
    };
    let endpoint = StatusEndpoint {
        port: addr.port(),
        path: "status".to_string(),
    };
    match role {
        MemberRole::Pd => config.pd = endpoint,
        MemberRole::Tikv => config.tikv = endpoint,
        MemberRole::Tidb => config.tidb = endpoint,
    }
    config
}
