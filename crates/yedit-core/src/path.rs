// Dotted/indexed path notation.
// - `a.b[0].c` addresses key `a`, key `b`, index 0, key `c`.
// - `[N]` is a list index (negative counts from the end), anything else a map key.
// - Key characters: ASCII alphanumerics plus `%/_-`, plus whichever of the
//   reserved delimiters (`.`, `#`, `|`, `:`) is not the active one.
// - The empty path addresses the document root.
use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_DELIMITER: char = '.';
pub const RESERVED_DELIMITERS: [char; 4] = ['.', '#', '|', ':'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Index(i64),
    Key(String),
}

impl Step {
    /// Resolve an index step against a sequence length.
    pub fn resolve_index(idx: i64, len: usize) -> Option<usize> {
        let len = len as i64;
        let pos = if idx < 0 { len + idx } else { idx };
        (0..len).contains(&pos).then_some(pos as usize)
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Index(i) => write!(f, "[{}]", i),
            Step::Key(k) => f.write_str(k),
        }
    }
}

/// Compiled grammar for one delimiter.
#[derive(Debug, Clone)]
pub struct PathSyntax {
    delimiter: char,
    valid: Regex,
    token: Regex,
}

impl PathSyntax {
    pub fn new(delimiter: char) -> Self {
        let mut class = String::from("0-9a-zA-Z");
        for c in ['%', '/', '_', '-']
            .into_iter()
            .chain(RESERVED_DELIMITERS)
            .filter(|c| *c != delimiter)
        {
            class.push_str(&regex::escape(&c.to_string()));
        }
        let delim = regex::escape(&delimiter.to_string());
        let valid = format!(r"^(?:(?:\[-?\d+\]|[{class}]+)(?:{delim})?)+$");
        let token = format!(r"\[(-?\d+)\]|([{class}]+)");
        Self {
            delimiter,
            // Both patterns are assembled from escaped literals only.
            valid: Regex::new(&valid).expect("path grammar is a valid regex"),
            token: Regex::new(&token).expect("path token grammar is a valid regex"),
        }
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn validate(&self, path: &str) -> bool {
        self.valid.is_match(path)
    }

    pub fn parse(&self, path: &str) -> Vec<Step> {
        self.token
            .captures_iter(path)
            .filter_map(|caps| {
                if let Some(idx) = caps.get(1) {
                    // Out-of-range literals can never address an element.
                    let n = idx.as_str().parse::<i64>().unwrap_or(i64::MAX);
                    Some(Step::Index(n))
                } else {
                    caps.get(2).map(|k| Step::Key(k.as_str().to_string()))
                }
            })
            .collect()
    }
}

static RESERVED_SYNTAX: Lazy<Vec<PathSyntax>> =
    Lazy::new(|| RESERVED_DELIMITERS.iter().map(|d| PathSyntax::new(*d)).collect());

/// Grammar for `delimiter`, shared for the reserved delimiters.
pub fn syntax(delimiter: char) -> Cow<'static, PathSyntax> {
    match RESERVED_SYNTAX.iter().find(|s| s.delimiter == delimiter) {
        Some(s) => Cow::Borrowed(s),
        None => Cow::Owned(PathSyntax::new(delimiter)),
    }
}

pub fn validate(path: &str, delimiter: char) -> bool {
    syntax(delimiter).validate(path)
}

pub fn parse(path: &str, delimiter: char) -> Vec<Step> {
    if path.is_empty() {
        return Vec::new();
    }
    syntax(delimiter).parse(path)
}

/// Validate then parse. `None` when a non-empty path is malformed.
pub fn parse_checked(path: &str, delimiter: char) -> Option<Vec<Step>> {
    if path.is_empty() {
        return Some(Vec::new());
    }
    let syntax = syntax(delimiter);
    syntax.validate(path).then(|| syntax.parse(path))
}
