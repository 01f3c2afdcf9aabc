#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use docserver_controller::config::ControllerConfig;
use docserver_controller::crd::{DocServer, DocServerSpec};
use docserver_controller::crd::docserver::Target;
use docserver_controller::templates::label_selector;
use envconfig::Envconfig;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Service};
use kube::{
    Client,
    api::{Api, DeleteParams, ListParams},
};
use tokio::task::JoinHandle;

// DNS-1123 safe numeric suffix for unique names
pub const DIGITS: [char; 10] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
pub fn uniq(prefix: &str) -> String {
    format!("{prefix}-{}", nanoid::nanoid!(6, &DIGITS))
}

pub fn test_config() -> ControllerConfig {
    let env = HashMap::from([(
        "DOCSERVER_REQUEUE_SECS".to_string(),
        "2".to_string(),
    )]);
    ControllerConfig::init_from_hashmap(&env).expect("test config")
}

pub fn docserver(name: &str, url: &str) -> DocServer {
    DocServer::new(
        name,
        DocServerSpec {
            target: Target {
                url: url.to_string(),
                depth: 1,
                ..Default::default()
            },
            replicas: 1,
            image: None,
            storage: Default::default(),
            gitpod: Default::default(),
        },
    )
}

/// Poll until `name` exists in `api`, up to `secs` seconds.
pub async fn wait_for<K>(api: &Api<K>, name: &str, secs: u64) -> Option<K>
where
    K: Clone + serde::de::DeserializeOwned + std::fmt::Debug,
{
    for _ in 0..secs {
        if let Ok(Some(obj)) = api.get_opt(name).await {
            return Some(obj);
        }
        tokio::time::sleep(Duration::from_millis(1000)).await;
    }
    None
}

pub async fn cleanup_k8s(ns: &str, name: &str, client: Client) {
    // Best-effort: children normally go with the DocServer through owner
    // references; delete by label too so nothing outlives the test.
    let ds_api: Api<DocServer> = Api::namespaced(client.clone(), ns);
    let _ = ds_api.delete(name, &DeleteParams::default()).await;

    let lp = ListParams::default().labels(&label_selector(name));
    let bg = DeleteParams::background();
    let jobs: Api<Job> = Api::namespaced(client.clone(), ns);
    let _ = jobs.delete_collection(&bg, &lp).await;
    let deps: Api<Deployment> = Api::namespaced(client.clone(), ns);
    let _ = deps.delete_collection(&bg, &lp).await;
    let svcs: Api<Service> = Api::namespaced(client.clone(), ns);
    if let Ok(list) = svcs.list(&lp).await {
        for s in list {
            if let Some(n) = s.metadata.name {
                let _ = svcs.delete(&n, &bg).await;
            }
        }
    }
    let pvcs: Api<PersistentVolumeClaim> = Api::namespaced(client, ns);
    let _ = pvcs.delete_collection(&bg, &lp).await;
}

// RAII guard to ensure controller abort + cleanup
pub struct ControllerGuard {
    ns: String,
    name: String,
    client: Client,
    ctrl: Option<JoinHandle<()>>,
}

impl ControllerGuard {
    pub fn new(ns: &str, name: &str, client: Client) -> Self {
        Self {
            ns: ns.to_string(),
            name: name.to_string(),
            client,
            ctrl: None,
        }
    }
    pub fn with_controller(mut self, ctrl: JoinHandle<()>) -> Self {
        self.ctrl = Some(ctrl);
        self
    }
}

impl Drop for ControllerGuard {
    fn drop(&mut self) {
        if let Some(ref handle) = self.ctrl {
            handle.abort();
        }
        let ns = self.ns.clone();
        let name = self.name.clone();
        let client = self.client.clone();
        let _ = tokio::spawn(async move {
            cleanup_k8s(&ns, &name, client).await;
        });
    }
}
