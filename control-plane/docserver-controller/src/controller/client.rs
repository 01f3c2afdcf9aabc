//! Cluster operations used by the reconcile engine.
//!
//! The engine only ever talks to the cluster through [`ClusterClient`], so
//! it can be driven by mocks or an in-memory fake in tests.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Service};
use kube::{
    Client, Resource,
    api::{Api, ApiResource, DynamicObject, Patch, PatchParams},
    runtime::events::{Event, EventType, Recorder, Reporter},
};
#[cfg(test)]
use mockall::automock;
use serde_json::{Value, json};

use super::ReconcileErr;
use crate::crd::{DocServer, DocServerStatus};
use crate::templates::{ChildKind, FIELD_MANAGER};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Fetch a child as raw JSON; `Ok(None)` when it does not exist.
    async fn get_child(
        &self,
        kind: ChildKind,
        ns: &str,
        name: &str,
    ) -> Result<Option<Value>, ReconcileErr>;

    /// Force-apply a child manifest under [`FIELD_MANAGER`].
    async fn apply_child(
        &self,
        kind: ChildKind,
        ns: &str,
        name: &str,
        manifest: &Value,
    ) -> Result<(), ReconcileErr>;

    async fn patch_status(
        &self,
        ns: &str,
        name: &str,
        status: DocServerStatus,
    ) -> Result<(), ReconcileErr>;

    async fn publish_event(
        &self,
        ds: &DocServer,
        reason: &str,
        note: String,
    ) -> Result<(), ReconcileErr>;
}

pub struct KubeClusterClient {
    client: Client,
    recorder: Recorder,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        let reporter = Reporter {
            controller: FIELD_MANAGER.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        let recorder = Recorder::new(client.clone(), reporter);
        Self { client, recorder }
    }

    fn child_api(&self, kind: ChildKind, ns: &str) -> Api<DynamicObject> {
        let ar = match kind {
            ChildKind::VolumeClaim => {
                ApiResource::erase::<PersistentVolumeClaim>(&())
            }
            ChildKind::CloneJob => ApiResource::erase::<Job>(&()),
            ChildKind::Deployment => ApiResource::erase::<Deployment>(&()),
            ChildKind::Service => ApiResource::erase::<Service>(&()),
        };
        Api::namespaced_with(self.client.clone(), ns, &ar)
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get_child(
        &self,
        kind: ChildKind,
        ns: &str,
        name: &str,
    ) -> Result<Option<Value>, ReconcileErr> {
        match self.child_api(kind, ns).get_opt(name).await? {
            Some(obj) => Ok(Some(serde_json::to_value(&obj)?)),
            None => Ok(None),
        }
    }

    async fn apply_child(
        &self,
        kind: ChildKind,
        ns: &str,
        name: &str,
        manifest: &Value,
    ) -> Result<(), ReconcileErr> {
        let pp = PatchParams::apply(FIELD_MANAGER).force();
        self.child_api(kind, ns)
            .patch(name, &pp, &Patch::Apply(manifest))
            .await?;
        Ok(())
    }

    async fn patch_status(
        &self,
        ns: &str,
        name: &str,
        status: DocServerStatus,
    ) -> Result<(), ReconcileErr> {
        let api: Api<DocServer> = Api::namespaced(self.client.clone(), ns);
        let patch = json!({ "status": status });
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn publish_event(
        &self,
        ds: &DocServer,
        reason: &str,
        note: String,
    ) -> Result<(), ReconcileErr> {
        self.recorder
            .publish(
                &Event {
                    type_: EventType::Normal,
                    reason: reason.into(),
                    note: Some(note),
                    action: "Reconcile".into(),
                    secondary: None,
                },
                &ds.object_ref(&()),
            )
            .await?;
        Ok(())
    }
}
