//! The document store.
//!
//! [`Yedit`] owns one document plus the settings needed to address and
//! persist it. Every mutation runs on a clone of the document that replaces
//! the current one only when the mutation succeeded and changed something, so
//! a failed edit leaves the previously observable document untouched.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::navigate::{self, key_name};
use crate::path::{self, PathSyntax, Step};
use crate::persist::{self, ContentType, FormatMode};

/// Seed content for a store, used instead of the file's contents.
#[derive(Debug, Clone)]
pub enum Content {
    Document(Value),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct YeditOptions {
    pub filename: Option<PathBuf>,
    pub content: Option<Content>,
    pub content_type: ContentType,
    pub delimiter: char,
    pub backup: bool,
    pub format: FormatMode,
}

impl Default for YeditOptions {
    fn default() -> Self {
        Self {
            filename: None,
            content: None,
            content_type: ContentType::Yaml,
            delimiter: path::DEFAULT_DELIMITER,
            backup: false,
            format: FormatMode::Preserve,
        }
    }
}

/// Outcome of a single store operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edit {
    pub changed: bool,
    pub document: Value,
}

#[derive(Debug, Clone)]
pub struct Yedit {
    filename: Option<PathBuf>,
    content_type: ContentType,
    syntax: PathSyntax,
    backup: bool,
    format: FormatMode,
    loaded: bool,
    doc: Value,
}

impl Yedit {
    /// Build a store, loading the seed content or else the file.
    ///
    /// When neither yields a document the store starts from an empty mapping.
    pub fn new(options: YeditOptions) -> Result<Self> {
        let YeditOptions {
            filename,
            content,
            content_type,
            delimiter,
            backup,
            format,
        } = options;

        let doc = match content {
            Some(Content::Document(v)) => Some(v),
            Some(Content::Text(text)) if !text.trim().is_empty() => {
                Some(persist::parse_str(&text, content_type)?)
            }
            _ => match &filename {
                Some(f) => persist::load(f, content_type)?,
                None => None,
            },
        };
        let loaded = doc.is_some();
        Ok(Self {
            filename,
            content_type,
            syntax: path::syntax(delimiter).into_owned(),
            backup,
            format,
            loaded,
            doc: doc.unwrap_or_else(|| Value::Object(Map::new())),
        })
    }

    /// An in-memory store over `doc` with default settings.
    pub fn from_document(doc: Value) -> Self {
        Self {
            filename: None,
            content_type: ContentType::default(),
            syntax: path::syntax(path::DEFAULT_DELIMITER).into_owned(),
            backup: false,
            format: FormatMode::default(),
            loaded: true,
            doc,
        }
    }

    pub fn open(filename: impl Into<PathBuf>, content_type: ContentType) -> Result<Self> {
        Self::new(YeditOptions {
            filename: Some(filename.into()),
            content_type,
            ..YeditOptions::default()
        })
    }

    pub fn document(&self) -> &Value {
        &self.doc
    }

    pub fn set_document(&mut self, doc: Value) {
        self.doc = doc;
    }

    pub fn into_document(self) -> Value {
        self.doc
    }

    /// Whether a document was found in the seed content or on disk.
    pub fn loaded(&self) -> bool {
        self.loaded
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn delimiter(&self) -> char {
        self.syntax.delimiter()
    }

    pub fn set_delimiter(&mut self, delimiter: char) {
        self.syntax = path::syntax(delimiter).into_owned();
    }

    pub fn file_exists(&self) -> bool {
        self.filename.as_deref().is_some_and(Path::exists)
    }

    fn steps(&self, path: &str) -> Option<Vec<Step>> {
        if path.is_empty() {
            return Some(Vec::new());
        }
        self.syntax
            .validate(path)
            .then(|| self.syntax.parse(path))
    }

    fn edit(&self, changed: bool) -> Edit {
        Edit {
            changed,
            document: self.doc.clone(),
        }
    }

    fn transact<F>(&mut self, op: &str, path: &str, f: F) -> Result<Edit>
    where
        F: FnOnce(&mut Value) -> Result<bool>,
    {
        let mut copy = self.doc.clone();
        let changed = f(&mut copy)?;
        if changed {
            self.doc = copy;
        }
        debug!(op, path, changed, "applied edit");
        Ok(self.edit(changed))
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        let steps = self.steps(path)?;
        navigate::get(&self.doc, &steps)
    }

    /// Check whether `value` is present at `path`.
    ///
    /// Sequences test membership. A mapping matches a mapping `value` when
    /// every key of `value` is present with an equal value, and a string
    /// `value` when it names one of its keys. Anything else is compared for
    /// equality.
    pub fn exists(&self, path: &str, value: &Value) -> bool {
        match self.get(path) {
            None => false,
            Some(Value::Array(items)) => items.contains(value),
            Some(Value::Object(map)) => match value {
                Value::Object(wanted) => wanted.iter().all(|(k, v)| map.get(k) == Some(v)),
                other => key_name(other).is_some_and(|k| map.contains_key(&k)),
            },
            Some(entry) => entry == value,
        }
    }

    /// Set `path` to `value`, creating intermediate mappings as needed.
    ///
    /// Returns unchanged when the value is already there, the path is
    /// malformed, or the root would be replaced by a scalar.
    pub fn put(&mut self, path: &str, value: Value) -> Result<Edit> {
        if self.get(path) == Some(&value) {
            return Ok(self.edit(false));
        }
        let Some(steps) = self.steps(path) else {
            return Ok(self.edit(false));
        };
        self.transact("put", path, |doc| navigate::set(doc, &steps, value))
    }

    /// Merge into a mapping, or replace/add an item of a sequence.
    ///
    /// For sequences, `curr_value` locates the item to replace and takes
    /// priority over `index`. Without either, `value` is appended unless
    /// already present. A blank `curr_value` (null, false, 0, empty) counts
    /// as not given.
    pub fn update(
        &mut self,
        path: &str,
        value: Value,
        index: Option<i64>,
        curr_value: Option<&Value>,
    ) -> Result<Edit> {
        let Some(steps) = self.steps(path) else {
            return Ok(self.edit(false));
        };
        let curr_value = curr_value.filter(|cv| !navigate::is_blank(cv));
        self.transact("update", path, |doc| {
            match navigate::get_mut(doc, &steps) {
                Some(Value::Object(map)) => match value {
                    Value::Object(incoming) => {
                        for (k, v) in incoming {
                            map.insert(k, v);
                        }
                        Ok(true)
                    }
                    other => Err(Error::TypeMismatch(format!(
                        "cannot replace key, value entry in dict with non-dict type. value=[{}]",
                        other
                    ))),
                },
                Some(Value::Array(items)) => {
                    let pos = if let Some(cv) = curr_value {
                        match items.iter().position(|item| item == cv) {
                            Some(pos) => Some(pos),
                            None => return Ok(false),
                        }
                    } else if let Some(i) = index {
                        match Step::resolve_index(i, items.len()) {
                            Some(pos) => Some(pos),
                            None => return Ok(false),
                        }
                    } else {
                        None
                    };

                    if let Some(pos) = pos
                        && items[pos] != value
                    {
                        items[pos] = value;
                        return Ok(true);
                    }
                    if items.contains(&value) {
                        return Ok(false);
                    }
                    items.push(value);
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    /// Push onto the sequence at `path`, creating an empty one if nothing is there.
    pub fn append(&mut self, path: &str, value: Value) -> Result<Edit> {
        let Some(steps) = self.steps(path) else {
            return Ok(self.edit(false));
        };
        self.transact("append", path, |doc| {
            if navigate::get(doc, &steps).is_none()
                && !navigate::set(doc, &steps, Value::Array(Vec::new()))?
            {
                return Ok(false);
            }
            match navigate::get_mut(doc, &steps) {
                Some(Value::Array(items)) => {
                    items.push(value);
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    /// Remove a key from the mapping, or the first equal item from the
    /// sequence, found at `path`.
    pub fn pop(&mut self, path: &str, key_or_item: &Value) -> Result<Edit> {
        let Some(steps) = self.steps(path) else {
            return Ok(self.edit(false));
        };
        self.transact("pop", path, |doc| {
            Ok(match navigate::get_mut(doc, &steps) {
                Some(Value::Object(map)) => key_name(key_or_item)
                    .is_some_and(|k| map.shift_remove(&k).is_some()),
                Some(Value::Array(items)) => match items.iter().position(|i| i == key_or_item) {
                    Some(pos) => {
                        items.remove(pos);
                        true
                    }
                    None => false,
                },
                _ => false,
            })
        })
    }

    /// Delete `path`. See [`navigate::remove`] for the root-level `index`/`value` forms.
    pub fn delete(
        &mut self,
        path: &str,
        index: Option<i64>,
        value: Option<&Value>,
    ) -> Result<Edit> {
        if self.get(path).is_none() {
            return Ok(self.edit(false));
        }
        let Some(steps) = self.steps(path) else {
            return Ok(self.edit(false));
        };
        self.transact("delete", path, |doc| navigate::remove(doc, &steps, index, value))
    }

    /// Set `path` only while the backing file does not exist yet.
    pub fn create(&mut self, path: &str, value: Value) -> Result<Edit> {
        if self.file_exists() {
            return Ok(self.edit(false));
        }
        let Some(steps) = self.steps(path) else {
            return Ok(self.edit(false));
        };
        self.transact("create", path, |doc| navigate::set(doc, &steps, value))
    }

    /// Persist the document to the store's file.
    pub fn write(&self) -> Result<Edit> {
        persist::write(
            self.filename.as_deref(),
            &self.doc,
            self.content_type,
            self.format,
            self.backup,
        )?;
        Ok(self.edit(true))
    }
}
