use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_DEPTH: i32 = 1;
pub const DEFAULT_SERVER_IMAGE: &str = "squidfunk/mkdocs-material:latest";
pub const DEFAULT_GITPOD_IMAGE: &str = "docogawa/gitpod:latest";
pub const DEFAULT_STORAGE_SIZE: &str = "3Gi";
pub const DEFAULT_STORAGE_CLASS: &str = "default";

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
#[kube(
    group = "update.git-ogawa.github.io",
    version = "v1beta1",
    kind = "DocServer",
    plural = "docservers",
    namespaced,
    status = "DocServerStatus",
    printcolumn = r#"{"name":"REPLICAS","type":"integer","jsonPath":".spec.replicas"}"#,
    printcolumn = r#"{"name":"STATUS","type":"string","jsonPath":".status"}"#,
    printcolumn = r#"{"name":"AGE","type":"date","jsonPath":".metadata.creationTimestamp"}"#,
    printcolumn = r#"{"name":"BRANCH","type":"string","jsonPath":".spec.target.branch","priority":1}"#,
    printcolumn = r#"{"name":"URL","type":"string","jsonPath":".spec.target.url","priority":1}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DocServerSpec {
    /// Git repository the document sources are pulled from
    pub target: Target,
    /// Number of docserver pods
    #[serde(default = "default_replicas")]
    pub replicas: i32,
    /// Image (name:tag) of the docserver container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// PersistentVolumeClaim properties
    #[serde(default)]
    pub storage: Storage,
    /// Properties of the gitpod (clone) job
    #[serde(default)]
    pub gitpod: Gitpod,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    /// Repository url; must start with https or ssh and end with .git
    #[schemars(regex(pattern = r"^(https|ssh).*\.git$"))]
    pub url: String,
    /// Branch to pull (default "main")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Depth of the shallow clone; values <= 0 fall back to 1
    #[serde(default = "default_depth")]
    pub depth: i32,
    /// Whether to verify the host certificate when pulling (default true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_verify: Option<bool>,
    /// Secret holding `username`/`password` for basic authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth_secret: Option<String>,
    /// SSH config map and private key secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_secret: Option<SshSecret>,
    /// Secret holding the CA bundle for TLS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_secret: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct SshSecret {
    /// Name of the ConfigMap storing the ssh config
    #[serde(default)]
    pub config: String,
    /// Name of the Secret storing the ssh private key
    #[serde(default, rename = "privatekey")]
    pub private_key: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Storage {
    /// Requested volume capacity (default "3Gi")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// StorageClassName of the claim (default "default")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    /// BlockOwnerDeletion set on the claim's owner reference (default false)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_owner_deletion: Option<bool>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct Gitpod {
    /// Image (name:tag) of the gitpod container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Observed state of a DocServer. Serialized as the whole `.status` string.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
pub enum DocServerStatus {
    NotReady,
    Available,
    Healthy,
}

impl std::fmt::Display for DocServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocServerStatus::NotReady => write!(f, "NotReady"),
            DocServerStatus::Available => write!(f, "Available"),
            DocServerStatus::Healthy => write!(f, "Healthy"),
        }
    }
}

// --- Defaults helpers ---
fn default_replicas() -> i32 {
    1
}

fn default_depth() -> i32 {
    DEFAULT_DEPTH
}

// Effective values used by the builders. These re-apply the admission
// defaults so rendering stays stable when the webhook is bypassed.
impl Target {
    pub fn effective_branch(&self) -> &str {
        match self.branch.as_deref() {
            Some(b) if !b.is_empty() => b,
            _ => DEFAULT_BRANCH,
        }
    }

    pub fn effective_depth(&self) -> i32 {
        if self.depth <= 0 { DEFAULT_DEPTH } else { self.depth }
    }

    pub fn effective_ssl_verify(&self) -> bool {
        self.ssl_verify.unwrap_or(true)
    }

    pub fn basic_auth_secret(&self) -> Option<&str> {
        self.basic_auth_secret.as_deref().filter(|s| !s.is_empty())
    }

    pub fn tls_secret(&self) -> Option<&str> {
        self.tls_secret.as_deref().filter(|s| !s.is_empty())
    }
}

impl DocServerSpec {
    pub fn effective_image(&self) -> &str {
        non_empty_or(self.image.as_deref(), DEFAULT_SERVER_IMAGE)
    }

    pub fn effective_gitpod_image(&self) -> &str {
        non_empty_or(self.gitpod.image.as_deref(), DEFAULT_GITPOD_IMAGE)
    }
}

impl Storage {
    pub fn effective_size(&self) -> &str {
        non_empty_or(self.size.as_deref(), DEFAULT_STORAGE_SIZE)
    }

    pub fn effective_storage_class(&self) -> &str {
        non_empty_or(self.storage_class.as_deref(), DEFAULT_STORAGE_CLASS)
    }

    pub fn effective_block_owner_deletion(&self) -> bool {
        self.block_owner_deletion.unwrap_or(false)
    }
}

fn non_empty_or<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => fallback,
    }
}
