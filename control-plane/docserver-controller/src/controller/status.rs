use kube::runtime::controller::Action;
use serde_json::Value;
use tokio::time::Duration;

use crate::crd::DocServerStatus;

/// Fold the deployment's available replica count into a status.
///
/// Not monotonic: a Healthy server regresses as soon as replicas go away.
pub fn derive_status(available: i32, desired: i32) -> DocServerStatus {
    if available <= 0 {
        DocServerStatus::NotReady
    } else if available == desired {
        DocServerStatus::Healthy
    } else {
        DocServerStatus::Available
    }
}

/// `status.availableReplicas` of a live deployment; absent counts as zero.
pub fn available_replicas(deployment: Option<&Value>) -> i32 {
    deployment
        .and_then(|d| d.pointer("/status/availableReplicas"))
        .and_then(Value::as_i64)
        .and_then(|n| i32::try_from(n).ok())
        .unwrap_or(0)
}

/// Healthy ends the convergence cycle; anything else polls again.
pub fn next_action(status: DocServerStatus, requeue_secs: u64) -> Action {
    match status {
        DocServerStatus::Healthy => Action::await_change(),
        _ => Action::requeue(Duration::from_secs(requeue_secs)),
    }
}
