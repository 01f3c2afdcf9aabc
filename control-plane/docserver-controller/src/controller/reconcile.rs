use std::sync::Arc;

use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use tracing::{debug, info, instrument, trace};

use super::client::ClusterClient;
use super::events::emit_applied;
use super::managed_fields::extract_owned;
use super::status::{available_replicas, derive_status, next_action};
use super::{ControllerContext, ReconcileErr};
use crate::config::ControllerConfig;
use crate::crd::DocServer;
use crate::templates::{ChildKind, FIELD_MANAGER, RenderedResource, render};

/// Entry point handed to the kube-runtime controller.
pub async fn reconcile(
    obj: Arc<DocServer>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileErr> {
    reconcile_docserver(ctx.client.as_ref(), &obj, &ctx.cfg).await
}

/// Converge the four children of one DocServer, then derive its status.
///
/// Errors abort the attempt as-is; children applied before the failure stay
/// applied and the next attempt picks up from there.
#[instrument(skip_all, fields(ns = %ds.namespace().unwrap_or_else(|| "default".into()), name = %ds.name_any()))]
pub async fn reconcile_docserver(
    client: &dyn ClusterClient,
    ds: &DocServer,
    cfg: &ControllerConfig,
) -> Result<Action, ReconcileErr> {
    if ds.meta().deletion_timestamp.is_some() {
        debug!("docserver is being deleted; skipping");
        return Ok(Action::await_change());
    }
    let ns = ds.namespace().ok_or(ReconcileErr::MissingNamespace)?;
    if ds.meta().uid.is_none() {
        return Err(ReconcileErr::MissingUid);
    }
    let name = ds.name_any();

    let mut applied = 0;
    for kind in ChildKind::ALL {
        let rendered = render(kind, ds);
        if reconcile_child(client, ds, &ns, &rendered, cfg.events_enabled)
            .await?
        {
            applied += 1;
        }
    }

    let dep_name = ChildKind::Deployment.child_name(&name);
    let deployment = client
        .get_child(ChildKind::Deployment, &ns, &dep_name)
        .await?;
    let available = available_replicas(deployment.as_ref());
    let status = derive_status(available, ds.spec.replicas);
    if ds.status != Some(status) {
        info!(
            from = ?ds.status,
            to = %status,
            available,
            desired = ds.spec.replicas,
            "status changed"
        );
        client.patch_status(&ns, &name, status).await?;
    }

    let action = next_action(status, cfg.requeue_secs);
    debug!(applied, %status, ?action, "reconcile finished");
    Ok(action)
}

/// Fetch, extract, compare and (only on a difference) apply one child.
/// Returns whether an apply was issued.
async fn reconcile_child(
    client: &dyn ClusterClient,
    ds: &DocServer,
    ns: &str,
    rendered: &RenderedResource,
    events_enabled: bool,
) -> Result<bool, ReconcileErr> {
    let kind = rendered.kind();
    let child_name = rendered.name();
    let desired = rendered.to_manifest()?;

    let live = client.get_child(kind, ns, &child_name).await?;
    let owned = extract_owned(
        live.as_ref(),
        FIELD_MANAGER,
        kind.api_version(),
        kind.kind(),
        &child_name,
        Some(ns),
    )?;
    if owned == desired {
        trace!(%kind, name = %child_name, "owned fields up to date");
        return Ok(false);
    }

    debug!(%kind, name = %child_name, exists = live.is_some(), "applying");
    client.apply_child(kind, ns, &child_name, &desired).await?;
    if events_enabled {
        emit_applied(client, ds, kind, &child_name).await;
    }
    Ok(true)
}
