// Walks parsed paths over a `serde_json::Value` tree.
// - Reads never fail: a shape mismatch or a missing key is simply `None`.
// - `set` creates missing intermediate mappings and reports shape conflicts.
// - `remove` never creates anything.
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::path::Step;

pub fn render(steps: &[Step]) -> String {
    let mut out = String::new();
    for step in steps {
        if !out.is_empty() && matches!(step, Step::Key(_)) {
            out.push('.');
        }
        out.push_str(&step.to_string());
    }
    out
}

/// Null, false, zero and empty strings/containers.
pub fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(m) => m.is_empty(),
    }
}

/// Name a mapping key after a scalar document value (`"a"` -> `a`, `1` -> `1`).
///
/// Null and containers name no key.
pub(crate) fn key_name(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) => Some(v.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

pub fn get<'a>(root: &'a Value, steps: &[Step]) -> Option<&'a Value> {
    let mut cur = root;
    for step in steps {
        cur = match (step, cur) {
            (Step::Key(k), Value::Object(map)) => map.get(k)?,
            (Step::Index(i), Value::Array(items)) => &items[Step::resolve_index(*i, items.len())?],
            _ => return None,
        };
    }
    Some(cur)
}

pub fn get_mut<'a>(root: &'a mut Value, steps: &[Step]) -> Option<&'a mut Value> {
    let mut cur = root;
    for step in steps {
        cur = match (step, cur) {
            (Step::Key(k), Value::Object(map)) => map.get_mut(k)?,
            (Step::Index(i), Value::Array(items)) => {
                let pos = Step::resolve_index(*i, items.len())?;
                &mut items[pos]
            }
            _ => return None,
        };
    }
    Some(cur)
}

/// Write `value` at `steps`, materialising missing intermediate mappings.
///
/// The empty path replaces the root, but only with a mapping or a sequence;
/// `Ok(false)` signals a rejected scalar root replacement.
pub fn set(root: &mut Value, steps: &[Step], value: Value) -> Result<bool> {
    let Some((last, parents)) = steps.split_last() else {
        if !matches!(value, Value::Object(_) | Value::Array(_)) {
            return Ok(false);
        }
        *root = value;
        return Ok(true);
    };

    let mut cur = root;
    for step in parents {
        cur = match (step, cur) {
            (Step::Key(k), Value::Object(map)) => {
                let child = map.entry(k.clone()).or_insert(Value::Null);
                if is_blank(child) {
                    *child = Value::Object(Map::new());
                }
                child
            }
            (Step::Key(k), _) => {
                return Err(Error::conflict(
                    &render(steps),
                    format!("at key: {}", k),
                ));
            }
            (Step::Index(i), Value::Array(items)) => {
                let Some(pos) = Step::resolve_index(*i, items.len()) else {
                    return Err(Error::conflict(
                        &render(steps),
                        format!("index {} out of range", i),
                    ));
                };
                &mut items[pos]
            }
            (Step::Index(i), _) => {
                return Err(Error::conflict(
                    &render(steps),
                    format!("index {} on a non-sequence", i),
                ));
            }
        };
    }

    let placed = match (last, cur) {
        (Step::Index(i), Value::Array(items)) => match Step::resolve_index(*i, items.len()) {
            Some(pos) => {
                items[pos] = value;
                true
            }
            None => false,
        },
        (Step::Key(k), Value::Object(map)) => {
            map.insert(k.clone(), value);
            true
        }
        _ => false,
    };
    if !placed {
        // e.g. `a.b[0]` where `a.b` is not an existing sequence
        return Err(Error::conflict(
            &render(steps),
            format!("cannot add {} to this node", last),
        ));
    }
    Ok(true)
}

/// Delete the entry at `steps`; returns whether anything was removed.
///
/// At the root, `value` names the mapping key or sequence item to drop and
/// `index` a sequence position; with neither, the root container is emptied.
pub fn remove(
    root: &mut Value,
    steps: &[Step],
    index: Option<i64>,
    value: Option<&Value>,
) -> Result<bool> {
    let Some((last, parents)) = steps.split_last() else {
        return remove_at_root(root, index, value);
    };

    let Some(parent) = get_mut(root, parents) else {
        return Ok(false);
    };
    let removed = match (last, parent) {
        (Step::Index(i), Value::Array(items)) => match Step::resolve_index(*i, items.len()) {
            Some(pos) => {
                items.remove(pos);
                true
            }
            None => false,
        },
        (Step::Key(k), Value::Object(map)) => map.shift_remove(k).is_some(),
        _ => false,
    };
    Ok(removed)
}

fn remove_at_root(root: &mut Value, index: Option<i64>, value: Option<&Value>) -> Result<bool> {
    match root {
        Value::Object(map) => {
            if let Some(v) = value {
                return Ok(key_name(v).is_some_and(|k| map.shift_remove(&k).is_some()));
            }
            if let Some(i) = index {
                return Err(Error::TypeMismatch(format!(
                    "remove_entry for a mapping does not take an index ({})",
                    i
                )));
            }
            map.clear();
            Ok(true)
        }
        Value::Array(items) => {
            let pos = if let Some(v) = value {
                match items.iter().position(|item| item == v) {
                    Some(pos) => pos,
                    None => return Ok(false),
                }
            } else if let Some(i) = index {
                match Step::resolve_index(i, items.len()) {
                    Some(pos) => pos,
                    None => return Ok(false),
                }
            } else {
                items.clear();
                return Ok(true);
            };
            items.remove(pos);
            Ok(true)
        }
        _ => Ok(false),
    }
}
