// Ordered edit lists applied to one store.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::persist::ContentType;
use crate::store::Yedit;
use crate::value::{self, ValueType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[default]
    Put,
    Update,
    Append,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditOperation {
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curr_value: Option<Value>,
    /// `yaml` or `json` when `curr_value` is a serialized document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curr_value_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
}

impl EditOperation {
    pub fn put(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
            action: Action::Put,
            index: None,
            curr_value: None,
            curr_value_format: None,
            value_type: None,
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    fn value_type(&self) -> Option<ValueType> {
        self.value_type.as_deref().and_then(ValueType::from_hint)
    }

    fn curr_value_format(&self) -> Option<ContentType> {
        self.curr_value_format
            .as_deref()
            .and_then(|f| f.parse::<ContentType>().ok())
    }
}

/// A changed edit: its key and the document right after it was applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditRecord {
    pub key: String,
    pub edit: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchResult {
    pub changed: bool,
    pub results: Vec<EditRecord>,
}

/// Apply `edits` in order. Later edits see the effect of earlier ones.
///
/// Only edits that changed the document are recorded. An error stops the
/// batch; edits applied before it stay applied.
pub fn process_edits(edits: &[EditOperation], store: &mut Yedit) -> Result<BatchResult> {
    let mut results = Vec::new();
    for op in edits {
        let value = value::parse_value(op.value.clone(), op.value_type())?;
        let outcome = match op.action {
            Action::Update => {
                let curr = value::curr_value(op.curr_value.clone(), op.curr_value_format())?;
                store.update(&op.key, value, op.index, curr.as_ref())?
            }
            Action::Append => store.append(&op.key, value)?,
            Action::Put => store.put(&op.key, value)?,
        };
        debug!(key = %op.key, action = ?op.action, changed = outcome.changed, "processed edit");
        if outcome.changed {
            results.push(EditRecord {
                key: op.key.clone(),
                edit: outcome.document,
            });
        }
    }
    Ok(BatchResult {
        changed: !results.is_empty(),
        results,
    })
}
