use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use kube::api::ObjectMeta;

use super::{HTTP_PORT, labels, owner_reference, server_name};
use crate::crd::DocServer;

pub fn build_service(ds: &DocServer) -> Service {
    let ds_name = ds.name_any();
    Service {
        metadata: ObjectMeta {
            name: Some(server_name(&ds_name)),
            namespace: ds.namespace(),
            labels: Some(labels(&ds_name)),
            owner_references: Some(vec![owner_reference(ds, true)]),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(labels(&ds_name)),
            type_: Some("ClusterIP".to_string()),
            ports: Some(vec![ServicePort {
                protocol: Some("TCP".to_string()),
                port: HTTP_PORT,
                target_port: Some(IntOrString::Int(HTTP_PORT)),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
