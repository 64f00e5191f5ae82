//! Member health probing
//!
//! Each member of a role is probed with one bounded GET against its status
//! endpoint, addressed through the role's headless peer service:
//!
//! `<cluster>-<role>-<ordinal>.<cluster>-<role>-peer.<namespace>:<port>/<path>`
//!
//! A report always carries one entry per declared replica. Probe failures of
//! any kind (transport, timeout, status >= 400) are recorded as `false` and
//! never retried here.

use crate::config::{ProbeConfig, StatusEndpoint};
use crate::error::ControlResult;
use crate::shutdown::ShutdownSignal;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tidbctl_common::{ClusterDescriptor, HealthReport, MemberRole};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// StatefulSet name of a role: `<cluster>-<role>`
pub fn member_name(cluster_name: &str, role: MemberRole) -> String {
    format!("{}-{}", cluster_name, role)
}

/// Headless service giving each member pod a stable DNS name
pub fn peer_service_name(cluster_name: &str, role: MemberRole) -> String {
    format!("{}-peer", member_name(cluster_name, role))
}

/// Pod name of one member; also the member's key in a `HealthReport`
pub fn pod_name(cluster_name: &str, role: MemberRole, ordinal: u32) -> String {
    format!("{}-{}", member_name(cluster_name, role), ordinal)
}

/// Fully qualified status address of a member on the role's well-known endpoint
pub fn member_address(
    cluster_name: &str,
    role: MemberRole,
    ordinal: u32,
    namespace: &str,
) -> String {
    endpoint_address(
        cluster_name,
        role,
        ordinal,
        namespace,
        &StatusEndpoint::default_for(role),
    )
}

/// Same as [`member_address`] with an explicit port and path
pub fn endpoint_address(
    cluster_name: &str,
    role: MemberRole,
    ordinal: u32,
    namespace: &str,
    endpoint: &StatusEndpoint,
) -> String {
    format!(
        "{}.{}.{}:{}/{}",
        pod_name(cluster_name, role, ordinal),
        peer_service_name(cluster_name, role),
        namespace,
        endpoint.port,
        endpoint.path.trim_start_matches('/'),
    )
}

/// Reports the health of a cluster's members
#[async_trait]
pub trait TidbControl: Send + Sync {
    /// Probe every declared member and return one flag per member
    async fn get_health(&self, tc: &ClusterDescriptor) -> ControlResult<HealthReport> {
        self.get_health_until(tc, ShutdownSignal::never()).await
    }

    /// Like `get_health`, but stops early when `shutdown` fires. Members
    /// whose probe had not finished are reported as `false`.
    async fn get_health_until(
        &self,
        tc: &ClusterDescriptor,
        shutdown: ShutdownSignal,
    ) -> ControlResult<HealthReport>;
}

/// Why a single probe failed
#[derive(Debug, thiserror::Error)]
enum ProbeError {
    #[error("request timed out: {0}")]
    Timeout(reqwest::Error),
    #[error("request failed: {0}")]
    Transport(reqwest::Error),
    #[error("error response {0}")]
    Status(StatusCode),
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProbeError::Timeout(err)
        } else {
            ProbeError::Transport(err)
        }
    }
}

/// Issue one status request and drain the body.
///
/// The response is owned by this function, so its connection is released on
/// every return path, including the error-status one.
async fn probe(client: &reqwest::Client, url: &str, timeout: Duration) -> Result<usize, ProbeError> {
    let response = client.get(url).timeout(timeout).send().await?;

    let status = response.status();
    if status.as_u16() >= 400 {
        return Err(ProbeError::Status(status));
    }

    let body = response.bytes().await?;
    Ok(body.len())
}

/// Network-probing reporter
pub struct DefaultTidbControl {
    client: reqwest::Client,
    config: ProbeConfig,
    role: MemberRole,
}

impl DefaultTidbControl {
    /// Build a reporter with its own HTTP client using the configured timeout
    pub fn new(config: ProbeConfig) -> ControlResult<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout()).build()?;
        Ok(Self::with_client(client, config))
    }

    /// Build a reporter around an existing (possibly shared) client
    pub fn with_client(client: reqwest::Client, config: ProbeConfig) -> Self {
        Self {
            client,
            config,
            role: MemberRole::Tidb,
        }
    }

    /// Probe members of another role instead of TiDB
    pub fn with_role(mut self, role: MemberRole) -> Self {
        self.role = role;
        self
    }

    fn status_url(&self, tc: &ClusterDescriptor, ordinal: u32) -> String {
        format!(
            "{}://{}",
            self.config.scheme,
            endpoint_address(
                &tc.name,
                self.role,
                ordinal,
                &tc.namespace,
                self.config.endpoint(self.role),
            )
        )
    }
}

#[async_trait]
impl TidbControl for DefaultTidbControl {
    async fn get_health_until(
        &self,
        tc: &ClusterDescriptor,
        mut shutdown: ShutdownSignal,
    ) -> ControlResult<HealthReport> {
        let replicas = tc.validate(self.role)?;

        let mut report: HealthReport = (0..replicas)
            .map(|ordinal| (pod_name(&tc.name, self.role, ordinal), false))
            .collect();

        if replicas == 0 || shutdown.is_cancelled() {
            return Ok(report);
        }

        let timeout = self.config.timeout();
        let permits = self.config.max_concurrent.clamp(1, replicas as usize);
        let semaphore = Arc::new(Semaphore::new(permits));
        let mut join_set = JoinSet::new();

        for ordinal in 0..replicas {
            let member = pod_name(&tc.name, self.role, ordinal);
            let url = self.status_url(tc, ordinal);
            let client = self.client.clone();
            let sem = semaphore.clone();

            join_set.spawn(async move {
                let healthy = match sem.acquire_owned().await {
                    Ok(_permit) => match probe(&client, &url, timeout).await {
                        Ok(_) => true,
                        Err(e) => {
                            debug!(member = %member, url = %url, error = %e, "Member probe failed");
                            false
                        }
                    },
                    Err(_) => false,
                };
                (member, healthy)
            });
        }

        loop {
            tokio::select! {
                joined = join_set.join_next() => match joined {
                    Some(Ok((member, healthy))) => {
                        if let Some(slot) = report.get_mut(&member) {
                            *slot = healthy;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Probe task did not complete");
                    }
                    None => break,
                },
                _ = shutdown.cancelled() => {
                    warn!(
                        namespace = %tc.namespace,
                        cluster = %tc.name,
                        pending = join_set.len(),
                        "Health probes cancelled"
                    );
                    join_set.abort_all();
                    break;
                }
            }
        }

        let healthy = report.values().filter(|h| **h).count();
        info!(
            namespace = %tc.namespace,
            cluster = %tc.name,
            role = %self.role,
            healthy,
            total = report.len(),
            "Member health collected"
        );

        Ok(report)
    }
}

/// Fixed-response reporter for tests; never touches the network
#[derive(Default)]
pub struct FakeTidbControl {
    health: RwLock<HealthReport>,
    calls: AtomicUsize,
}

impl FakeTidbControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the report returned by every subsequent call
    pub fn set_health(&self, health: HealthReport) {
        let mut guard = self.health.write().unwrap_or_else(|e| e.into_inner());
        *guard = health;
    }

    /// Number of reports served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TidbControl for FakeTidbControl {
    async fn get_health_until(
        &self,
        _tc: &ClusterDescriptor,
        _shutdown: ShutdownSignal,
    ) -> ControlResult<HealthReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let guard = self.health.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone())
    }
}
