//! Desired-state rendering for the children of a DocServer.
//!
//! Every builder is a pure function of the DocServer value: no I/O, and the
//! same input always renders the same manifest.

pub mod clone_job;
pub mod deployment;
pub mod owner;
pub mod service;
pub mod volume_claim;


use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Service};
use kube::ResourceExt;

use crate::crd::DocServer;

pub use clone_job::build_clone_job;
pub use deployment::build_deployment;
pub use owner::owner_reference;
pub use service::build_service;
pub use volume_claim::build_volume_claim;

/// Field manager identity used for every server-side apply.
pub const FIELD_MANAGER: &str = "docserver-controller";

pub const LABEL_NAME: &str = "app.kubernetes.io/name";
pub const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";
pub const LABEL_CREATED_BY: &str = "app.kubernetes.io/created-by";
pub const APP_NAME: &str = "mkdocs";

/// Volume shared by the clone job and the server, backed by the claim.
pub const SOURCE_VOLUME: &str = "source";
pub const SOURCE_MOUNT_PATH: &str = "/docs";
pub const HTTP_PORT: i32 = 8000;

/// Name shared by the claim, the deployment and the service.
pub fn server_name(ds_name: &str) -> String {
    format!("docserver-{}", ds_name)
}

pub fn clone_job_name(ds_name: &str) -> String {
    format!("gitpod-{}", ds_name)
}

/// The fixed label triple carried by every child and used as selector.
pub fn labels(ds_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_NAME.to_string(), APP_NAME.to_string()),
        (LABEL_INSTANCE.to_string(), ds_name.to_string()),
        (LABEL_CREATED_BY.to_string(), FIELD_MANAGER.to_string()),
    ])
}

pub fn label_selector(ds_name: &str) -> String {
    labels(ds_name)
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

/// The child kinds managed per DocServer, in reconcile order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChildKind {
    VolumeClaim,
    CloneJob,
    Deployment,
    Service,
}

impl ChildKind {
    pub const ALL: [ChildKind; 4] = [
        ChildKind::VolumeClaim,
        ChildKind::CloneJob,
        ChildKind::Deployment,
        ChildKind::Service,
    ];

    pub fn kind(&self) -> &'static str {
        match self {
            ChildKind::VolumeClaim => "PersistentVolumeClaim",
            ChildKind::CloneJob => "Job",
            ChildKind::Deployment => "Deployment",
            ChildKind::Service => "Service",
        }
    }

    pub fn api_version(&self) -> &'static str {
        match self {
            ChildKind::VolumeClaim | ChildKind::Service => "v1",
            ChildKind::CloneJob => "batch/v1",
            ChildKind::Deployment => "apps/v1",
        }
    }

    pub fn child_name(&self, ds_name: &str) -> String {
        match self {
            ChildKind::CloneJob => clone_job_name(ds_name),
            _ => server_name(ds_name),
        }
    }
}

impl std::fmt::Display for ChildKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RenderedResource {
    VolumeClaim(PersistentVolumeClaim),
    CloneJob(Job),
    Deployment(Deployment),
    Service(Service),
}

impl RenderedResource {
    pub fn kind(&self) -> ChildKind {
        match self {
            RenderedResource::VolumeClaim(_) => ChildKind::VolumeClaim,
            RenderedResource::CloneJob(_) => ChildKind::CloneJob,
            RenderedResource::Deployment(_) => ChildKind::Deployment,
            RenderedResource::Service(_) => ChildKind::Service,
        }
    }

    pub fn name(&self) -> String {
        match self {
            RenderedResource::VolumeClaim(r) => r.name_any(),
            RenderedResource::CloneJob(r) => r.name_any(),
            RenderedResource::Deployment(r) => r.name_any(),
            RenderedResource::Service(r) => r.name_any(),
        }
    }

    /// Serialized apply manifest, including apiVersion and kind.
    pub fn to_manifest(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            RenderedResource::VolumeClaim(r) => serde_json::to_value(r),
            RenderedResource::CloneJob(r) => serde_json::to_value(r),
            RenderedResource::Deployment(r) => serde_json::to_value(r),
            RenderedResource::Service(r) => serde_json::to_value(r),
        }
    }
}

/// Render one child kind for the given DocServer.
pub fn render(kind: ChildKind, ds: &DocServer) -> RenderedResource {
    match kind {
        ChildKind::VolumeClaim => {
            RenderedResource::VolumeClaim(build_volume_claim(ds))
        }
        ChildKind::CloneJob => RenderedResource::CloneJob(build_clone_job(ds)),
        ChildKind::Deployment => {
            RenderedResource::Deployment(build_deployment(ds))
        }
        ChildKind::Service => RenderedResource::Service(build_service(ds)),
    }
}
