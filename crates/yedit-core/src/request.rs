//! Idempotent list / absent / present requests against one file or inline
//! document, as issued by automation wrappers and the `yedit` CLI.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::batch::{self, Action, EditOperation};
use crate::error::{Error, Result};
use crate::path::DEFAULT_DELIMITER;
use crate::persist::{self, ContentType, FormatMode};
use crate::store::{Edit, Yedit, YeditOptions};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    List,
    Absent,
    #[default]
    Present,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Request {
    /// File to read and, when something changed, write back.
    pub src: Option<PathBuf>,
    /// Inline document (or its serialized text) replacing the loaded one.
    pub content: Option<Value>,
    pub content_type: ContentType,
    pub separator: char,
    pub state: State,
    pub key: String,
    pub value: Option<Value>,
    pub value_type: Option<String>,
    pub index: Option<i64>,
    pub curr_value: Option<Value>,
    pub curr_value_format: Option<String>,
    /// `present`: merge/replace instead of put. `absent`: pop `value` from `key`.
    pub update: bool,
    pub append: bool,
    pub edits: Option<Vec<EditOperation>>,
    pub backup: bool,
    pub format: FormatMode,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            src: None,
            content: None,
            content_type: ContentType::Yaml,
            separator: DEFAULT_DELIMITER,
            state: State::Present,
            key: String::new(),
            value: None,
            value_type: None,
            index: None,
            curr_value: None,
            curr_value_format: None,
            update: false,
            append: false,
            edits: None,
            backup: false,
            format: FormatMode::Preserve,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub changed: bool,
    pub result: Value,
    pub state: State,
}

impl Response {
    fn new(changed: bool, result: Value, state: State) -> Self {
        Self {
            changed,
            result,
            state,
        }
    }
}

impl Request {
    fn inline_content(&self) -> Result<Option<Value>> {
        match &self.content {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => persist::parse_str(s, self.content_type).map(Some),
            Some(other) => Ok(Some(other.clone())),
        }
    }

    /// The single `key`/`value` edit, or the explicit edit list.
    fn edits(&self) -> Vec<EditOperation> {
        let Some(value) = &self.value else {
            return self.edits.clone().unwrap_or_default();
        };
        let mut op = EditOperation::put(self.key.clone(), value.clone());
        op.value_type = self.value_type.clone();
        if self.update {
            op.action = Action::Update;
            op.index = self.index;
            op.curr_value = self.curr_value.clone();
            op.curr_value_format = self.curr_value_format.clone();
        } else if self.append {
            op.action = Action::Append;
        }
        vec![op]
    }
}

pub fn run(req: &Request) -> Result<Response> {
    let mut store = Yedit::new(YeditOptions {
        filename: req.src.clone(),
        content: None,
        content_type: req.content_type,
        delimiter: req.separator,
        backup: req.backup,
        format: req.format,
    })?;

    let content = req.inline_content()?;
    if let Some(src) = &req.src
        && !store.loaded()
        && content.is_none()
        && req.state != State::Present
    {
        return Err(Error::Load(format!(
            "Error opening file [{}].  Verify that the file exists, that it is has correct permissions, and is valid {}.",
            src.display(),
            req.content_type
        )));
    }
    debug!(state = ?req.state, key = %req.key, inline = content.is_some(), "running request");

    match req.state {
        State::List => {
            if let Some(doc) = content {
                store.set_document(doc);
            }
            let result = if req.key.is_empty() {
                store.document().clone()
            } else {
                store.get(&req.key).cloned().unwrap_or(Value::Null)
            };
            Ok(Response::new(false, result, req.state))
        }
        State::Absent => {
            if let Some(doc) = content {
                store.set_document(doc);
            }
            let outcome = match (req.update, &req.value) {
                (true, Some(item)) => store.pop(&req.key, item)?,
                // Nothing named to pop.
                (true, None) => Edit {
                    changed: false,
                    document: store.document().clone(),
                },
                (false, _) => store.delete(&req.key, req.index, req.value.as_ref())?,
            };
            if outcome.changed && req.src.is_some() {
                store.write()?;
            }
            Ok(Response::new(outcome.changed, outcome.document, req.state))
        }
        State::Present => {
            if let Some(doc) = content {
                if store.document() == &doc && req.value.is_none() {
                    return Ok(Response::new(false, doc, req.state));
                }
                store.set_document(doc);
            }

            let edits = req.edits();
            if !edits.is_empty() {
                let results = batch::process_edits(&edits, &mut store)?;
                if results.changed && req.src.is_some() {
                    store.write()?;
                }
                let records = serde_json::to_value(&results.results)
                    .map_err(|e| Error::Serialize(e.to_string()))?;
                return Ok(Response::new(results.changed, records, req.state));
            }

            if req.src.is_some() {
                // Nothing to edit: rewrite to normalise the file's formatting.
                let written = store.write()?;
                info!("rewrote document without edits");
                return Ok(Response::new(written.changed, written.document, req.state));
            }
            Ok(Response::new(false, store.into_document(), req.state))
        }
    }
}
