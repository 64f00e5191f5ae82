//! PD API clients
//!
//! `HttpPdClient` talks to a PD service over its JSON HTTP API;
//! `FakePdClient` serves canned answers for tests.

use super::error::{PdError, PdResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// PD API path prefix
pub const API_PREFIX: &str = "pd/api/v1";

/// Health of one PD member as reported by `/pd/api/v1/health`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberHealth {
    pub name: String,
    pub member_id: u64,
    #[serde(default)]
    pub client_urls: Vec<String>,
    pub health: bool,
}

/// Health of all PD members
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct HealthInfo {
    pub healths: Vec<MemberHealth>,
}

impl HealthInfo {
    pub fn all_healthy(&self) -> bool {
        !self.healths.is_empty() && self.healths.iter().all(|m| m.health)
    }
}

/// One PD member
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PdMember {
    pub name: String,
    pub member_id: u64,
    #[serde(default)]
    pub peer_urls: Vec<String>,
    #[serde(default)]
    pub client_urls: Vec<String>,
}

/// Response of `/pd/api/v1/members`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MembersInfo {
    #[serde(default)]
    pub members: Vec<PdMember>,
    #[serde(default)]
    pub leader: Option<PdMember>,
    #[serde(default)]
    pub etcd_leader: Option<PdMember>,
}

/// Administrative client of one cluster's PD service
#[async_trait]
pub trait PdClient: Send + Sync {
    /// Base URL of the PD service
    fn url(&self) -> &str;

    /// Health of every PD member
    async fn get_health(&self) -> PdResult<HealthInfo>;

    /// PD membership and leaders
    async fn get_members(&self) -> PdResult<MembersInfo>;
}

/// PD client over HTTP
#[derive(Clone)]
pub struct HttpPdClient {
    url: String,
    http: reqwest::Client,
}

impl HttpPdClient {
    pub fn new(url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> PdResult<T> {
        let url = format!("{}/{}/{}", self.url, API_PREFIX, path);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| PdError::Http {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(PdError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| PdError::Decode { url, source })
    }
}

#[async_trait]
impl PdClient for HttpPdClient {
    fn url(&self) -> &str {
        &self.url
    }

    async fn get_health(&self) -> PdResult<HealthInfo> {
        let healths: Vec<MemberHealth> = self.get_json("health").await?;
        Ok(HealthInfo { healths })
    }

    async fn get_members(&self) -> PdResult<MembersInfo> {
        self.get_json("members").await
    }
}

impl std::fmt::Debug for HttpPdClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPdClient").field("url", &self.url).finish()
    }
}

/// Canned PD client for tests
#[derive(Default)]
pub struct FakePdClient {
    url: String,
    health: RwLock<HealthInfo>,
    members: RwLock<MembersInfo>,
}

impl FakePdClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn set_health(&self, health: HealthInfo) {
        *self.health.write().unwrap_or_else(|e| e.into_inner()) = health;
    }

    pub fn set_members(&self, members: MembersInfo) {
        *self.members.write().unwrap_or_else(|e| e.into_inner()) = members;
    }
}

#[async_trait]
impl PdClient for FakePdClient {
    fn url(&self) -> &str {
        &self.url
    }

    async fn get_health(&self) -> PdResult<HealthInfo> {
        Ok(self.health.read().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn get_members(&self) -> PdResult<MembersInfo> {
        Ok(self.members.read().unwrap_or_else(|e| e.into_inner()).clone())
    }
}
