//! Loading and writing documents.
//!
//! Writes go through a sibling `<file>.edit` temp file that is locked
//! (non-blocking, exclusive), written, synced and renamed over the target, so
//! readers only ever see the old or the new file. The temp file is removed on
//! every error path once the lock is ours. A handle whose temp file was renamed
//! away before we got the lock is dropped and the temp file reopened.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

pub const TEMP_SUFFIX: &str = "edit";
pub const BACKUP_TIMESTAMP: &str = "%Y%m%dT%H%M%S";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    #[serde(alias = "yml")]
    Yaml,
    Json,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Yaml => "yaml",
            ContentType::Json => "json",
        }
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(ContentType::Yaml),
            "json" => Ok(ContentType::Json),
            _ => Err(Error::UnsupportedContentType(s.to_string())),
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much of the source layout survives a write.
///
/// `Preserve` keeps mapping keys in their source order. Comments, quoting and
/// anchors are not retained by the serializers in use, so preservation is
/// best-effort. `Plain` sorts mapping keys recursively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatMode {
    #[default]
    Preserve,
    Plain,
}

pub fn parse_str(contents: &str, content_type: ContentType) -> Result<Value> {
    let parsed = match content_type {
        ContentType::Yaml => serde_yaml::from_str::<Value>(contents).map_err(|e| e.to_string()),
        ContentType::Json => serde_json::from_str::<Value>(contents).map_err(|e| e.to_string()),
    };
    parsed.map_err(|message| Error::Parse {
        content_type: content_type.as_str(),
        message,
    })
}

/// Read `path`; `None` when the file is missing or blank.
pub fn load(path: &Path, content_type: ContentType) -> Result<Option<Value>> {
    if !path.exists() {
        debug!(path = %path.display(), "no file to load");
        return Ok(None);
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(None);
    }
    let doc = parse_str(&contents, content_type)?;
    debug!(path = %path.display(), %content_type, "loaded document");
    Ok(Some(doc))
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_keys(v)))
                    .collect::<Map<_, _>>(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

pub fn to_string(doc: &Value, content_type: ContentType, mode: FormatMode) -> Result<String> {
    let sorted;
    let doc = match mode {
        FormatMode::Preserve => doc,
        FormatMode::Plain => {
            sorted = sort_keys(doc);
            &sorted
        }
    };
    match content_type {
        ContentType::Yaml => {
            serde_yaml::to_string(doc).map_err(|e| Error::Serialize(e.to_string()))
        }
        ContentType::Json => {
            let mut buf = Vec::with_capacity(256);
            let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
            let mut ser = serde_json::Serializer::with_formatter(&mut buf, fmt);
            doc.serialize(&mut ser)
                .map_err(|e| Error::Serialize(e.to_string()))?;
            buf.push(b'\n');
            String::from_utf8(buf).map_err(|e| Error::Serialize(e.to_string()))
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

pub fn temp_path(path: &Path) -> PathBuf {
    with_suffix(path, TEMP_SUFFIX)
}

/// Copy `path` to `<path>.<YYYYmmddTHHMMSS>` if it exists.
///
/// Two backups taken within the same second share a name; the later one wins.
pub fn backup(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let ts = chrono::Local::now().format(BACKUP_TIMESTAMP).to_string();
    let dest = with_suffix(path, &ts);
    fs::copy(path, &dest)?;
    info!(src = %path.display(), dest = %dest.display(), "backed up file");
    Ok(Some(dest))
}

// Removes the temp file unless it was renamed into place.
struct TempFile {
    path: PathBuf,
    armed: bool,
}

impl TempFile {
    fn persist(mut self, target: &Path) -> Result<()> {
        fs::rename(&self.path, target)?;
        self.armed = false;
        Ok(())
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.armed
            && let Err(e) = fs::remove_file(&self.path)
        {
            warn!(path = %self.path.display(), error = %e, "failed to remove temp file");
        }
    }
}

const OPEN_ATTEMPTS: usize = 3;

#[cfg(unix)]
fn names_file(path: &Path, file: &File) -> Result<bool> {
    use std::os::unix::fs::MetadataExt;
    let held = file.metadata()?;
    match fs::metadata(path) {
        Ok(current) => Ok(held.dev() == current.dev() && held.ino() == current.ino()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

// Open files cannot be renamed over here, so a handle never goes stale.
#[cfg(not(unix))]
fn names_file(path: &Path, _file: &File) -> Result<bool> {
    Ok(path.exists())
}

/// Lock `file`, previously opened from `tmp`.
///
/// `None` when `tmp` no longer names that file: another writer renamed it
/// into place (or removed it) between our open and our lock, and writing
/// through the handle would edit the live target.
fn lock_temp(tmp: &Path, file: File) -> Result<Option<File>> {
    file.try_lock_exclusive().map_err(|e| {
        if e.kind() == ErrorKind::WouldBlock {
            Error::Locked {
                path: tmp.to_path_buf(),
                source: e,
            }
        } else {
            Error::Io(e)
        }
    })?;
    if names_file(tmp, &file)? {
        return Ok(Some(file));
    }
    FileExt::unlock(&file)?;
    Ok(None)
}

fn open_temp(tmp: &Path) -> Result<File> {
    for _ in 0..OPEN_ATTEMPTS {
        // Not truncated on open: the current holder of the lock may still be writing.
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(tmp)?;
        if let Some(file) = lock_temp(tmp, file)? {
            return Ok(file);
        }
        debug!(path = %tmp.display(), "temp file replaced before lock, reopening");
    }
    Err(Error::Locked {
        path: tmp.to_path_buf(),
        source: io::Error::new(ErrorKind::WouldBlock, "temp file keeps being replaced"),
    })
}

/// Replace `path` with `contents` via a locked sibling temp file and a rename.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp = temp_path(path);
    let mut file = open_temp(&tmp)?;
    let guard = TempFile {
        path: tmp,
        armed: true,
    };

    file.set_len(0)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    guard.persist(path)?;
    // The lock goes with the handle; release it only once the rename is done.
    FileExt::unlock(&file)?;
    debug!(path = %path.display(), bytes = contents.len(), "replaced file");
    Ok(())
}

/// Serialize `doc` and atomically replace `path`, taking a backup first if asked.
pub fn write(
    path: Option<&Path>,
    doc: &Value,
    content_type: ContentType,
    mode: FormatMode,
    make_backup: bool,
) -> Result<()> {
    let path = path.ok_or(Error::NoFilename)?;
    if make_backup {
        backup(path)?;
    }
    let contents = to_string(doc, content_type, mode)?;
    write_atomic(path, &contents)?;
    info!(path = %path.display(), %content_type, "wrote document");
    Ok(())
}
