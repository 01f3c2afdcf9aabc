use tracing::debug;

use super::client::ClusterClient;
use crate::crd::DocServer;
use crate::templates::ChildKind;

pub const REASON_APPLIED: &str = "Applied";

/// Publish an `Applied` event for a child. Event delivery is best-effort and
/// never fails the reconcile.
pub async fn emit_applied(
    client: &dyn ClusterClient,
    ds: &DocServer,
    kind: ChildKind,
    name: &str,
) {
    let note = format!("Applied {} {}", kind, name);
    if let Err(e) = client.publish_event(ds, REASON_APPLIED, note).await {
        debug!(error = %e, %kind, %name, "failed to publish event");
    }
}
