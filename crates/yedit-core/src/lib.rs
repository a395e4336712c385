//! yedit-core: path-addressed editing of YAML and JSON documents
//!
//! This crate focuses on a small, well-factored surface:
//! - Dotted/indexed path grammar (`a.b[0].c`) with a configurable delimiter
//! - Tree navigation over `serde_json::Value` with create-on-write
//! - A copy-on-write document store with idempotent put/update/append/delete
//! - Ordered edit batches with value type coercion
//! - Locked temp file + atomic rename write-back, with timestamped backups
//!
pub mod batch;
pub mod error;
pub mod navigate;
pub mod path;
pub mod persist;
pub mod request;
pub mod store;
pub mod value;

pub use batch::{Action, BatchResult, EditOperation, EditRecord, process_edits};
pub use error::{Error, Result};
pub use path::{Step, parse, validate};
pub use persist::{ContentType, FormatMode};
pub use request::{Request, Response, State, run};
pub use store::{Content, Edit, Yedit, YeditOptions};
pub use value::{ValueType, parse_value};
