//! In-memory cluster that behaves like server-side apply closely enough for
//! the reconcile tests: applies merge into the stored object and record the
//! applied field set under the manager's `managedFields` entry.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::ReconcileErr;
use super::client::ClusterClient;
use crate::crd::{DocServer, DocServerStatus};
use crate::templates::{ChildKind, FIELD_MANAGER};

type Key = (ChildKind, String, String);

#[derive(Default)]
struct State {
    objects: HashMap<Key, Value>,
    applies: Vec<(ChildKind, String)>,
    gets: usize,
    status_patches: Vec<DocServerStatus>,
    events: Vec<(String, String)>,
}

#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<State>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_count(&self) -> usize {
        self.state.lock().unwrap().applies.len()
    }

    pub fn applied_kinds(&self) -> Vec<ChildKind> {
        let st = self.state.lock().unwrap();
        st.applies.iter().map(|(k, _)| *k).collect()
    }

    pub fn get_count(&self) -> usize {
        self.state.lock().unwrap().gets
    }

    pub fn status_patches(&self) -> Vec<DocServerStatus> {
        self.state.lock().unwrap().status_patches.clone()
    }

    pub fn last_status(&self) -> Option<DocServerStatus> {
        self.status_patches().last().copied()
    }

    pub fn events(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn reset_counters(&self) {
        let mut st = self.state.lock().unwrap();
        st.applies.clear();
        st.gets = 0;
        st.status_patches.clear();
        st.events.clear();
    }

    pub fn object(&self, kind: ChildKind, ns: &str, name: &str) -> Option<Value> {
        let st = self.state.lock().unwrap();
        st.objects
            .get(&(kind, ns.to_string(), name.to_string()))
            .cloned()
    }

    /// Mutate a stored object without touching its managed fields, as a
    /// controller or another client writing to the live object would.
    pub fn edit(
        &self,
        kind: ChildKind,
        ns: &str,
        name: &str,
        f: impl FnOnce(&mut Value),
    ) {
        let mut st = self.state.lock().unwrap();
        let obj = st
            .objects
            .get_mut(&(kind, ns.to_string(), name.to_string()))
            .expect("object must exist before editing");
        f(obj);
    }

    pub fn set_available_replicas(&self, ns: &str, name: &str, n: i32) {
        self.edit(ChildKind::Deployment, ns, name, |obj| {
            obj["status"] = json!({ "availableReplicas": n });
        });
    }
}

/// Field set for an applied manifest. Lists are owned as a whole, which is
/// enough for the fake since it never splits list ownership.
fn field_set(v: &Value) -> Value {
    match v {
        Value::Object(m) if !m.is_empty() => Value::Object(
            m.iter()
                .map(|(k, v)| (format!("f:{}", k), field_set(v)))
                .collect(),
        ),
        _ => Value::Object(Map::new()),
    }
}

fn deep_merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(t), Value::Object(p)) => {
            for (k, v) in p {
                deep_merge(t.entry(k.clone()).or_insert(Value::Null), v);
            }
        }
        (t, p) => *t = p.clone(),
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn get_child(
        &self,
        kind: ChildKind,
        ns: &str,
        name: &str,
    ) -> Result<Option<Value>, ReconcileErr> {
        let mut st = self.state.lock().unwrap();
        st.gets += 1;
        Ok(st
            .objects
            .get(&(kind, ns.to_string(), name.to_string()))
            .cloned())
    }

    async fn apply_child(
        &self,
        kind: ChildKind,
        ns: &str,
        name: &str,
        manifest: &Value,
    ) -> Result<(), ReconcileErr> {
        let mut st = self.state.lock().unwrap();
        st.applies.push((kind, name.to_string()));
        let key = (kind, ns.to_string(), name.to_string());
        let uid = format!("uid-{}-{}", kind, name);
        let obj = st.objects.entry(key).or_insert_with(|| {
            json!({ "metadata": { "uid": uid, "resourceVersion": "1" } })
        });
        deep_merge(obj, manifest);

        let mut owned = manifest.clone();
        if let Value::Object(m) = &mut owned {
            m.remove("apiVersion");
            m.remove("kind");
        }
        let entry = json!({
            "manager": FIELD_MANAGER,
            "operation": "Apply",
            "apiVersion": manifest["apiVersion"],
            "fieldsType": "FieldsV1",
            "fieldsV1": field_set(&owned),
        });
        let managed = obj["metadata"]
            .as_object_mut()
            .expect("metadata is an object")
            .entry("managedFields")
            .or_insert_with(|| json!([]));
        if let Value::Array(entries) = managed {
            entries.retain(|e| e["manager"] != FIELD_MANAGER);
            entries.push(entry);
        }
        Ok(())
    }

    async fn patch_status(
        &self,
        _ns: &str,
        _name: &str,
        status: DocServerStatus,
    ) -> Result<(), ReconcileErr> {
        self.state.lock().unwrap().status_patches.push(status);
        Ok(())
    }

    async fn publish_event(
        &self,
        _ds: &DocServer,
        reason: &str,
        note: String,
    ) -> Result<(), ReconcileErr> {
        self.state
            .lock()
            .unwrap()
            .events
            .push((reason.to_string(), note));
        Ok(())
    }
}
