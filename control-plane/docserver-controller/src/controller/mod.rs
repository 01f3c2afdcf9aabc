pub mod client;
pub mod events;
pub mod managed_fields;
pub mod reconcile;
pub mod status;

#[cfg(test)]
mod fake;

use std::sync::Arc;

use futures_util::StreamExt;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Service};
use kube::{
    Client, Resource, ResourceExt,
    api::Api,
    runtime::{Controller, controller::Action, watcher::Config},
};
use tokio::time::Duration;
use tracing::{error, info, warn};

use crate::config::ControllerConfig;
use crate::crd::DocServer;

pub use client::{ClusterClient, KubeClusterClient};
pub use reconcile::{reconcile, reconcile_docserver};

#[derive(thiserror::Error, Debug)]
pub enum ReconcileErr {
    #[error("kube api error: {0}")]
    Kube(#[from] kube::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("managed fields extraction failed: {0}")]
    Extraction(String),
    #[error("docserver has no uid")]
    MissingUid,
    #[error("docserver has no namespace")]
    MissingNamespace,
}

#[derive(Clone)]
pub struct ControllerContext {
    pub client: Arc<dyn ClusterClient>,
    pub cfg: ControllerConfig,
}

fn scoped_api<K>(client: &Client, ns: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    <K as Resource>::DynamicType: Default,
{
    match ns {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Watch DocServers and their children until the stream ends.
pub async fn run_controller(
    client: Client,
    cfg: ControllerConfig,
) -> anyhow::Result<()> {
    let scope = cfg.namespace_scope().map(str::to_string);
    let ns = scope.as_deref();
    let docservers: Api<DocServer> = scoped_api(&client, ns);
    let claims: Api<PersistentVolumeClaim> = scoped_api(&client, ns);
    let jobs: Api<Job> = scoped_api(&client, ns);
    let deployments: Api<Deployment> = scoped_api(&client, ns);
    let services: Api<Service> = scoped_api(&client, ns);

    let ctx = Arc::new(ControllerContext {
        client: Arc::new(KubeClusterClient::new(client.clone())),
        cfg,
    });
    info!(namespace = ?ns, "starting docserver controller");

    Controller::new(docservers, Config::default())
        .owns(claims, Config::default())
        .owns(jobs, Config::default())
        .owns(deployments, Config::default())
        .owns(services, Config::default())
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj_ref, action)) => {
                    info!(object = %obj_ref, "reconciled: requeue={:?}", action)
                }
                Err(e) => error!(error = ?e, "reconcile error"),
            }
        })
        .await;

    Ok(())
}

fn error_policy(
    obj: Arc<DocServer>,
    error: &ReconcileErr,
    ctx: Arc<ControllerContext>,
) -> Action {
    warn!(
        name = %obj.name_any(),
        %error,
        "reconcile failed; requeueing"
    );
    Action::requeue(Duration::from_secs(ctx.cfg.error_requeue_secs))
}
