//! Structural change summaries
//!
//! Walks two monitor bodies and lists every differing leaf. Objects are
//! compared key by key, arrays position by position. Server-managed
//! volatile fields are left out.

use monsync_core::domain::{ChangeKind, ChangeSummary, FieldChange, MonitorBody};
use serde_json::Value;

/// Changes that turn `before` into `after`
pub fn summarize(before: &MonitorBody, after: &MonitorBody) -> ChangeSummary {
    let mut changes = Vec::new();
    walk("", &before.comparable_value(), &after.comparable_value(), &mut changes);
    ChangeSummary { changes }
}

fn walk(path: &str, before: &Value, after: &Value, out: &mut Vec<FieldChange>) {
    match (before, after) {
        (Value::Object(a), Value::Object(b)) => {
            let mut keys: Vec<&String> = a.keys().chain(b.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                match (a.get(key), b.get(key)) {
                    (Some(x), Some(y)) => walk(&child, x, y, out),
                    (Some(x), None) => out.push(removed(child, x)),
                    (None, Some(y)) => out.push(added(child, y)),
                    (None, None) => {}
                }
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            for i in 0..a.len().max(b.len()) {
                let child = format!("{path}[{i}]");
                match (a.get(i), b.get(i)) {
                    (Some(x), Some(y)) => walk(&child, x, y, out),
                    (Some(x), None) => out.push(removed(child, x)),
                    (None, Some(y)) => out.push(added(child, y)),
                    (None, None) => {}
                }
            }
        }
        (x, y) if x != y => out.push(FieldChange {
            path: path.to_string(),
            kind: ChangeKind::Changed,
            before: Some(x.clone()),
            after: Some(y.clone()),
        }),
        _ => {}
    }
}

fn added(path: String, value: &Value) -> FieldChange {
    FieldChange {
        path,
        kind: ChangeKind::Added,
        before: None,
        after: Some(value.clone()),
    }
}

fn removed(path: String, value: &Value) -> FieldChange {
    FieldChange {
        path,
        kind: ChangeKind::Removed,
        before: Some(value.clone()),
        after: None,
    }
}
