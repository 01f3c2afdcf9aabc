//! Field-manager scoped read-back of live objects.
//!
//! The API server records, per manager, the set of fields it owns in
//! `metadata.managedFields[].fieldsV1`. Projecting the live object onto the
//! set owned by our apply manager yields the same shape we would send in an
//! apply, so it can be compared directly against the desired manifest.
//! Fields owned by anyone else never show up in the projection.

use serde_json::{Map, Value};
use tracing::trace;

use super::ReconcileErr;

const APPLY_OPERATION: &str = "Apply";

/// Extract the part of `live` owned by `manager` through server-side apply.
///
/// `live` of `None` (object absent) and objects with no entry for the manager
/// both yield just the identity skeleton (apiVersion, kind, name, namespace).
pub fn extract_owned(
    live: Option<&Value>,
    manager: &str,
    api_version: &str,
    kind: &str,
    name: &str,
    namespace: Option<&str>,
) -> Result<Value, ReconcileErr> {
    let mut out = skeleton(api_version, kind, name, namespace);
    let Some(live) = live else {
        return Ok(out);
    };
    let Some(fields) = owned_field_set(live, manager) else {
        trace!(%manager, %kind, %name, "no managed fields entry for manager");
        return Ok(out);
    };
    if let Some(Value::Object(projected)) = project(live, fields)? {
        merge_into(&mut out, projected);
    }
    Ok(out)
}

/// The `fieldsV1` set of the Apply entry for `manager` on the main resource.
fn owned_field_set<'a>(live: &'a Value, manager: &str) -> Option<&'a Map<String, Value>> {
    live.get("metadata")?
        .get("managedFields")?
        .as_array()?
        .iter()
        .find(|entry| {
            entry.get("manager").and_then(Value::as_str) == Some(manager)
                && entry.get("operation").and_then(Value::as_str)
                    == Some(APPLY_OPERATION)
                && entry
                    .get("subresource")
                    .and_then(Value::as_str)
                    .map(str::is_empty)
                    .unwrap_or(true)
        })?
        .get("fieldsV1")?
        .as_object()
}

fn skeleton(
    api_version: &str,
    kind: &str,
    name: &str,
    namespace: Option<&str>,
) -> Value {
    let mut metadata = Map::new();
    metadata.insert("name".into(), Value::String(name.to_string()));
    if let Some(ns) = namespace {
        metadata.insert("namespace".into(), Value::String(ns.to_string()));
    }
    let mut root = Map::new();
    root.insert("apiVersion".into(), Value::String(api_version.to_string()));
    root.insert("kind".into(), Value::String(kind.to_string()));
    root.insert("metadata".into(), Value::Object(metadata));
    Value::Object(root)
}

fn merge_into(target: &mut Value, source: Map<String, Value>) {
    let Value::Object(target_map) = target else {
        return;
    };
    for (k, v) in source {
        match (target_map.get_mut(&k), v) {
            (Some(existing @ Value::Object(_)), Value::Object(inner)) => {
                merge_into(existing, inner)
            }
            (_, v) => {
                target_map.insert(k, v);
            }
        }
    }
}

/// Project `value` onto a field set. Returns `None` when nothing in the set is
/// present on the value.
fn project(value: &Value, set: &Map<String, Value>) -> Result<Option<Value>, ReconcileErr> {
    // An empty set marks a leaf: the whole value is owned.
    if set.is_empty() {
        return Ok(Some(value.clone()));
    }
    match value {
        Value::Object(obj) => project_object(obj, set),
        Value::Array(items) => project_list(items, set),
        other => Ok(Some(other.clone())),
    }
}

fn child_set<'a>(path: &str, child: &'a Value) -> Result<&'a Map<String, Value>, ReconcileErr> {
    child
        .as_object()
        .ok_or_else(|| ReconcileErr::Extraction(format!("field set for {} is not an object", path)))
}

fn project_object(
    obj: &Map<String, Value>,
    set: &Map<String, Value>,
) -> Result<Option<Value>, ReconcileErr> {
    let mut out = Map::new();
    let mut owns_self = false;
    for (path, child) in set {
        if path == "." {
            owns_self = true;
            continue;
        }
        let Some(field) = path.strip_prefix("f:") else {
            return Err(ReconcileErr::Extraction(format!(
                "unexpected path element {} on a map",
                path
            )));
        };
        let Some(v) = obj.get(field) else {
            continue;
        };
        if let Some(p) = project(v, child_set(path, child)?)? {
            out.insert(field.to_string(), p);
        }
    }
    if out.is_empty() && !owns_self {
        return Ok(None);
    }
    Ok(Some(Value::Object(out)))
}

/// Path elements addressing one list item.
enum ItemPath {
    Key(Map<String, Value>),
    Value(Value),
    Index(usize),
}

fn parse_item_path(path: &str) -> Result<ItemPath, ReconcileErr> {
    if let Some(raw) = path.strip_prefix("k:") {
        let key: Value = serde_json::from_str(raw)
            .map_err(|e| ReconcileErr::Extraction(format!("bad key {}: {}", raw, e)))?;
        return match key {
            Value::Object(m) => Ok(ItemPath::Key(m)),
            _ => Err(ReconcileErr::Extraction(format!("key {} is not an object", raw))),
        };
    }
    if let Some(raw) = path.strip_prefix("v:") {
        let v: Value = serde_json::from_str(raw)
            .map_err(|e| ReconcileErr::Extraction(format!("bad value {}: {}", raw, e)))?;
        return Ok(ItemPath::Value(v));
    }
    if let Some(raw) = path.strip_prefix("i:") {
        let i = raw
            .parse::<usize>()
            .map_err(|e| ReconcileErr::Extraction(format!("bad index {}: {}", raw, e)))?;
        return Ok(ItemPath::Index(i));
    }
    Err(ReconcileErr::Extraction(format!(
        "unexpected path element {} on a list",
        path
    )))
}

fn item_matches(path: &ItemPath, idx: usize, item: &Value) -> bool {
    match path {
        ItemPath::Key(key) => key
            .iter()
            .all(|(k, v)| item.get(k) == Some(v)),
        ItemPath::Value(v) => item == v,
        ItemPath::Index(i) => *i == idx,
    }
}

fn project_list(
    items: &[Value],
    set: &Map<String, Value>,
) -> Result<Option<Value>, ReconcileErr> {
    let mut paths = Vec::with_capacity(set.len());
    for (path, child) in set {
        if path == "." {
            continue;
        }
        paths.push((parse_item_path(path)?, child_set(path, child)?));
    }

    // Keep the live order; apply preserves the order we sent.
    let mut out = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        let Some((path, child)) = paths.iter().find(|(p, _)| item_matches(p, idx, item)) else {
            continue;
        };
        let mut projected = project(item, child)?.unwrap_or_else(|| Value::Object(Map::new()));
        // Key fields identify the item even if the set only marks it with ".".
        if let (ItemPath::Key(key), Value::Object(obj)) = (path, &mut projected) {
            for (k, v) in key {
                obj.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }
        out.push(projected);
    }
    if out.is_empty() {
        return Ok(None);
    }
    Ok(Some(Value::Array(out)))
}
