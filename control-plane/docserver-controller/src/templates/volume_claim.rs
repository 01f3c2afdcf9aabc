use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::ResourceExt;
use kube::api::ObjectMeta;

use super::{labels, owner_reference, server_name};
use crate::crd::DocServer;

pub fn build_volume_claim(ds: &DocServer) -> PersistentVolumeClaim {
    let ds_name = ds.name_any();
    let storage = &ds.spec.storage;
    let owner = owner_reference(ds, storage.effective_block_owner_deletion());

    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(server_name(&ds_name)),
            namespace: ds.namespace(),
            labels: Some(labels(&ds_name)),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteMany".to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(storage.effective_size().to_string()),
                )])),
                ..Default::default()
            }),
            storage_class_name: Some(
                storage.effective_storage_class().to_string(),
            ),
            volume_mode: Some("Filesystem".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}
