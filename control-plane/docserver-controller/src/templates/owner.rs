use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};

use crate::crd::DocServer;

/// Controller owner reference pointing a child back at its DocServer.
///
/// `block_owner_deletion` is true for the job, deployment and service; the
/// claim passes the DocServer's storage setting (false unless overridden).
pub fn owner_reference(ds: &DocServer, block_owner_deletion: bool) -> OwnerReference {
    OwnerReference {
        api_version: DocServer::api_version(&()).to_string(),
        kind: DocServer::kind(&()).to_string(),
        name: ds.name_any(),
        uid: ds.uid().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(block_owner_deletion),
    }
}
