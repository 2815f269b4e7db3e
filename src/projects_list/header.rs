//! # Header State Codec
//!
//! Reads and writes the table state kept in the hosting document's metadata
//! header: the leading block between two `---` lines.
//!
//! ```text
//! ---
//! title: Roadmap
//! projects-list-sort: "{\"column\":\"Updated\",\"direction\":\"desc\"}"
//! projects-list-pagination: "{\"pageSize\":25,\"currentPage\":1}"
//! ---
//! body...
//! ```
//!
//! The header is treated as a flat, ordered list of `key: value` lines. This is
//! not a YAML parser: nested blocks, comments and blank lines do not survive a
//! [`write`], and lines without a `key: value` shape are dropped.
//!
//! ## Pass-Through Keys
//!
//! Every key other than [`SORT_KEY`] and [`PAGINATION_KEY`] is kept as a
//! [`HeaderValue::Raw`] string and written back byte-for-byte, in its original
//! position. Only the two reserved keys are ever re-encoded.
//!
//! ## Guarantees
//!
//! - `read(write(t, s)) == Some(s)` for every [`HeaderFields`] with at least one field set.
//! - `write(write(t, s), s) == write(t, s)`.
//! - The document body after the closing `---` is never touched.
//!
//! ## Decode Failures
//!
//! A reserved value that does not parse as the expected JSON object makes
//! [`read`] fail as a whole with [`HeaderDecodeError`]. Callers fall back to
//! default state for both fields.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use std::borrow::Cow;

use crate::error::{HeaderDecodeError, Result};
use crate::model::HeaderFields;

pub const SORT_KEY: &str = "projects-list-sort";
pub const PAGINATION_KEY: &str = "projects-list-pagination";

const DELIMITER: &str = "---";
const BOM: char = '\u{feff}';

/// A header value as it will be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    /// Text found after `key:` in an existing header, trimmed. Written back verbatim.
    Raw(String),
    /// A logical string that still needs quoting (see [`quote_scalar`]).
    Encoded(String),
}

impl HeaderValue {
    fn rendered(&self) -> Cow<'_, str> {
        match self {
            HeaderValue::Raw(raw) => Cow::Borrowed(raw),
            HeaderValue::Encoded(value) => Cow::Owned(quote_scalar(value)),
        }
    }

    /// The value as a reader sees it, with any surrounding quotes removed.
    pub fn logical(&self) -> Cow<'_, str> {
        match self {
            HeaderValue::Raw(raw) => unquote(raw),
            HeaderValue::Encoded(value) => Cow::Borrowed(value),
        }
    }
}

/// A document split into its header entries and its body.
#[derive(Debug, Clone)]
pub struct Header<'a> {
    entries: IndexMap<String, HeaderValue>,
    body: &'a str,
    present: bool,
    bom: bool,
}

impl<'a> Header<'a> {
    /// Splits `text`. A document without a header yields an empty, absent header
    /// whose body is the whole text. A leading byte order mark is set aside
    /// and restored by [`Header::render`].
    pub fn parse(text: &'a str) -> Self {
        let stripped = text.strip_prefix(BOM);
        let bom = stripped.is_some();
        let text = stripped.unwrap_or(text);
        match split_header(text) {
            Some((content, body)) => Self {
                entries: parse_entries(content),
                body,
                present: true,
                bom,
            },
            None => Self {
                entries: IndexMap::new(),
                body: text,
                present: false,
                bom,
            },
        }
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    pub fn body(&self) -> &'a str {
        self.body
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Sets `key`, keeping its position if it already exists.
    pub fn set_encoded(&mut self, key: &str, value: String) {
        self.entries
            .insert(key.to_string(), HeaderValue::Encoded(value));
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.shift_remove(key);
    }

    /// Reassembles the document. A header that did not exist before is
    /// separated from the body by a blank line.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.body.len() + 128);
        if self.bom {
            out.push(BOM);
        }
        out.push_str(DELIMITER);
        out.push('\n');
        for (key, value) in &self.entries {
            let rendered = value.rendered();
            out.push_str(key);
            out.push(':');
            if !rendered.is_empty() {
                out.push(' ');
                out.push_str(&rendered);
            }
            out.push('\n');
        }
        out.push_str(DELIMITER);
        out.push('\n');

        if !self.present && !self.body.is_empty() && !self.body.starts_with('\n') {
            out.push('\n');
        }
        out.push_str(self.body);
        out
    }
}

/// Loads the persisted table state from `text`.
///
/// Returns `Ok(None)` when there is no header, or when it holds neither
/// reserved key (an empty value counts as missing).
pub fn read(text: &str) -> std::result::Result<Option<HeaderFields>, HeaderDecodeError> {
    let header = Header::parse(text);
    if !header.is_present() {
        return Ok(None);
    }

    let fields = HeaderFields {
        sort: decode_field(&header, SORT_KEY)?,
        pagination: decode_field(&header, PAGINATION_KEY)?,
    };

    if fields.is_empty() {
        Ok(None)
    } else {
        Ok(Some(fields))
    }
}

/// Returns `text` with the reserved keys set to `fields`.
///
/// A field that is `None` removes its key. All other keys are carried over
/// unchanged and in order.
pub fn write(text: &str, fields: &HeaderFields) -> Result<String> {
    let mut header = Header::parse(text);

    match &fields.sort {
        Some(sort) => header.set_encoded(SORT_KEY, serde_json::to_string(sort)?),
        None => header.remove(SORT_KEY),
    }
    match &fields.pagination {
        Some(pagination) => {
            header.set_encoded(PAGINATION_KEY, serde_json::to_string(pagination)?)
        }
        None => header.remove(PAGINATION_KEY),
    }

    Ok(header.render())
}

fn decode_field<T: DeserializeOwned>(
    header: &Header<'_>,
    field: &'static str,
) -> std::result::Result<Option<T>, HeaderDecodeError> {
    let Some(value) = header.get(field) else {
        return Ok(None);
    };
    let logical = value.logical();
    if logical.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&logical)
        .map(Some)
        .map_err(|source| HeaderDecodeError { field, source })
}

/// Finds the header block. Returns `(content, body)`, where `content` is the
/// text between the delimiter lines and `body` everything after the closing one.
fn split_header(text: &str) -> Option<(&str, &str)> {
    let first_end = text.find('\n')?;
    if text[..first_end].trim_end() != DELIMITER {
        return None;
    }

    let content_start = first_end + 1;
    let mut offset = content_start;
    loop {
        let line_end = text[offset..].find('\n').map(|i| offset + i);
        let line = &text[offset..line_end.unwrap_or(text.len())];
        if line.trim_end() == DELIMITER {
            let body = line_end.map(|end| &text[end + 1..]).unwrap_or("");
            return Some((&text[content_start..offset], body));
        }
        offset = line_end? + 1;
    }
}

/// Parses header lines into an ordered map. Lines without a `key: value`
/// shape are skipped, as are comments and list items. Later duplicates
/// overwrite earlier values but keep the first position.
fn parse_entries(content: &str) -> IndexMap<String, HeaderValue> {
    let mut entries = IndexMap::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("- ") {
            continue;
        }
        let Some(colon) = trimmed.find(':') else {
            continue;
        };
        let key = trimmed[..colon].trim();
        if key.is_empty() {
            continue;
        }
        let value = trimmed[colon + 1..].trim();
        entries.insert(key.to_string(), HeaderValue::Raw(value.to_string()));
    }
    entries
}

/// Quotes a logical value for a header line.
///
/// - Starts with `{` or `[`: double-quoted, with `\` and `"` escaped.
/// - Contains `:` or a space: double-quoted.
/// - Anything else is emitted bare.
pub fn quote_scalar(value: &str) -> String {
    let needs_quotes = value.starts_with('{')
        || value.starts_with('[')
        || value.contains(':')
        || value.contains(' ');
    if needs_quotes {
        format!("\"{}\"", escape_double(value))
    } else {
        value.to_string()
    }
}

fn escape_double(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out
}

/// Strips one level of double or single quotes, undoing their escapes.
fn unquote(raw: &str) -> Cow<'_, str> {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return Cow::Owned(unescape_double(&raw[1..raw.len() - 1]));
    }
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return Cow::Owned(raw[1..raw.len() - 1].replace("''", "'"));
    }
    Cow::Borrowed(raw)
}

fn unescape_double(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
