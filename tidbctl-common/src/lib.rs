//! Common types shared between the tidbctl controller and its callers

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-member health flags keyed by member identity (`<cluster>-<role>-<ordinal>`)
pub type HealthReport = HashMap<String, bool>;

/// Process role within a TiDB cluster
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Pd,   // placement driver (control plane)
    Tikv, // storage
    #[default]
    Tidb, // SQL layer
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pd => "pd",
            Self::Tikv => "tikv",
            Self::Tidb => "tidb",
        }
    }
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemberRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pd" => Ok(Self::Pd),
            "tikv" => Ok(Self::Tikv),
            "tidb" => Ok(Self::Tidb),
            other => Err(Error::Validation(format!("unknown member role '{}'", other))),
        }
    }
}

/// Kubernetes namespace a cluster lives in
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self(namespace.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Namespace {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Namespace {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Declared replica counts per role, as carried by the cluster resource
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RoleReplicas {
    #[serde(default)]
    pub pd: i32,
    #[serde(default)]
    pub tikv: i32,
    #[serde(default)]
    pub tidb: i32,
}

/// Read-only view of a deployed cluster
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterDescriptor {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub replicas: RoleReplicas,
}

impl ClusterDescriptor {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            replicas: RoleReplicas::default(),
        }
    }

    pub fn with_replicas(mut self, role: MemberRole, replicas: i32) -> Self {
        match role {
            MemberRole::Pd => self.replicas.pd = replicas,
            MemberRole::Tikv => self.replicas.tikv = replicas,
            MemberRole::Tidb => self.replicas.tidb = replicas,
        }
        self
    }

    /// Declared replica count for a role (unvalidated)
    pub fn replicas(&self, role: MemberRole) -> i32 {
        match role {
            MemberRole::Pd => self.replicas.pd,
            MemberRole::Tikv => self.replicas.tikv,
            MemberRole::Tidb => self.replicas.tidb,
        }
    }

    pub fn namespace(&self) -> Namespace {
        Namespace::new(self.namespace.clone())
    }

    /// Check identity fields and the role's replica count, returning the count
    pub fn validate(&self, role: MemberRole) -> Result<u32> {
        if self.namespace.trim().is_empty() {
            return Err(Error::Validation("cluster namespace must not be empty".into()));
        }
        if self.name.trim().is_empty() {
            return Err(Error::Validation("cluster name must not be empty".into()));
        }

        let replicas = self.replicas(role);
        u32::try_from(replicas).map_err(|_| {
            Error::Validation(format!(
                "cluster {}/{} declares negative {} replica count: {}",
                self.namespace, self.name, role, replicas
            ))
        })
    }
}

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
