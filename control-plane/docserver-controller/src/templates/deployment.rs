use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, HTTPGetAction, PersistentVolumeClaimVolumeSource,
    PodSpec, PodTemplateSpec, Probe, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use kube::api::ObjectMeta;

use super::{
    HTTP_PORT, SOURCE_MOUNT_PATH, SOURCE_VOLUME, labels, owner_reference,
    server_name,
};
use crate::crd::DocServer;

pub fn build_deployment(ds: &DocServer) -> Deployment {
    let ds_name = ds.name_any();
    let lbls = labels(&ds_name);

    let container = Container {
        name: "mkdocs".to_string(),
        image: Some(ds.spec.effective_image().to_string()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        volume_mounts: Some(vec![VolumeMount {
            name: SOURCE_VOLUME.to_string(),
            mount_path: SOURCE_MOUNT_PATH.to_string(),
            ..Default::default()
        }]),
        ports: Some(vec![ContainerPort {
            name: Some("http".to_string()),
            protocol: Some("TCP".to_string()),
            container_port: HTTP_PORT,
            ..Default::default()
        }]),
        liveness_probe: Some(http_probe()),
        readiness_probe: Some(http_probe()),
        ..Default::default()
    };

    Deployment {
        metadata: ObjectMeta {
            name: Some(server_name(&ds_name)),
            namespace: ds.namespace(),
            labels: Some(lbls.clone()),
            owner_references: Some(vec![owner_reference(ds, true)]),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(ds.spec.replicas),
            selector: LabelSelector {
                match_labels: Some(lbls.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(lbls),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    volumes: Some(vec![Volume {
                        name: SOURCE_VOLUME.to_string(),
                        persistent_volume_claim: Some(
                            PersistentVolumeClaimVolumeSource {
                                claim_name: server_name(&ds_name),
                                ..Default::default()
                            },
                        ),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn http_probe() -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some("/".to_string()),
            port: IntOrString::String("http".to_string()),
            scheme: Some("HTTP".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}
