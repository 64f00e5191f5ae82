//! PD (placement driver) client resolution
//!
//! Callers never build PD clients themselves. They ask a `PdControl`
//! provider for the client of a cluster; the default provider builds one
//! HTTP client per cluster and caches it.

pub mod client;
pub mod error;

use crate::config::PdConfig;
use async_trait::async_trait;
use client::{HttpPdClient, PdClient};
use error::{PdError, PdResult};
use std::collections::HashMap;
use std::sync::{Arc, RwLock as StdRwLock};
use tidbctl_common::{ClusterDescriptor, MemberRole, Namespace};
use tokio::sync::RwLock;

/// Provides the PD client of a cluster
#[async_trait]
pub trait PdControl: Send + Sync {
    async fn get_pd_client(&self, namespace: &Namespace, name: &str)
        -> PdResult<Arc<dyn PdClient>>;
}

/// Get the PD client of the given cluster.
///
/// Provider errors are returned as-is.
pub async fn get_pd_client(
    pdc: &dyn PdControl,
    tc: &ClusterDescriptor,
) -> PdResult<Arc<dyn PdClient>> {
    pdc.get_pd_client(&tc.namespace(), &tc.name).await
}

/// Cache key of a cluster's client: `<name>.<namespace>`
fn pd_client_key(namespace: &Namespace, name: &str) -> String {
    format!("{}.{}", name, namespace)
}

/// In-cluster URL of a cluster's PD service: `<scheme>://<name>-pd.<namespace>:<port>`
pub fn pd_client_url(config: &PdConfig, namespace: &Namespace, name: &str) -> String {
    format!(
        "{}://{}-{}.{}:{}",
        config.scheme,
        name,
        MemberRole::Pd,
        namespace,
        config.port
    )
}

/// Caching PD client provider
pub struct DefaultPdControl {
    config: PdConfig,
    http: reqwest::Client,
    clients: RwLock<HashMap<String, Arc<HttpPdClient>>>,
}

impl DefaultPdControl {
    pub fn new(config: PdConfig) -> PdResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(PdError::ClientBuild)?;
        Ok(Self::with_http_client(config, http))
    }

    /// Share an existing HTTP client between all PD clients
    pub fn with_http_client(config: PdConfig, http: reqwest::Client) -> Self {
        Self {
            config,
            http,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Drop the cached client of a cluster, e.g. after the cluster is deleted
    pub async fn remove_pd_client(&self, namespace: &Namespace, name: &str) {
        let key = pd_client_key(namespace, name);
        if self.clients.write().await.remove(&key).is_some() {
            tracing::debug!(key = %key, "Removed cached PD client");
        }
    }

    pub async fn cached_clients(&self) -> usize {
        self.clients.read().await.len()
    }
}

#[async_trait]
impl PdControl for DefaultPdControl {
    async fn get_pd_client(
        &self,
        namespace: &Namespace,
        name: &str,
    ) -> PdResult<Arc<dyn PdClient>> {
        let key = pd_client_key(namespace, name);

        let cached = self.clients.read().await.get(&key).cloned();
        if let Some(client) = cached {
            let client: Arc<dyn PdClient> = client;
            return Ok(client);
        }

        let mut clients = self.clients.write().await;
        let client: Arc<dyn PdClient> = clients
            .entry(key)
            .or_insert_with(|| {
                let url = pd_client_url(&self.config, namespace, name);
                tracing::info!(namespace = %namespace, cluster = %name, url = %url, "Created PD client");
                Arc::new(HttpPdClient::new(url, self.http.clone()))
            })
            .clone();

        Ok(client)
    }
}

/// PD client provider backed by clients registered in advance
#[derive(Default)]
pub struct FakePdControl {
    clients: StdRwLock<HashMap<String, Arc<dyn PdClient>>>,
}

impl FakePdControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the client returned for a cluster
    pub fn set_pd_client(&self, namespace: &Namespace, name: &str, client: Arc<dyn PdClient>) {
        self.clients
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(pd_client_key(namespace, name), client);
    }
}

#[async_trait]
impl PdControl for FakePdControl {
    async fn get_pd_client(
        &self,
        namespace: &Namespace,
        name: &str,
    ) -> PdResult<Arc<dyn PdClient>> {
        self.clients
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&pd_client_key(namespace, name))
            .cloned()
            .ok_or_else(|| PdError::ClientNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }
}
