//! Field-name escaping for MongoDB compatibility.
//!
//! MongoDB reserves `.` for nested field paths and `$` for operators, so
//! record keys containing either cannot be stored verbatim. Keys are escaped
//! on the way in and restored on the way out; values are never touched.

use bson::{Bson, Document};

/// Escapes and restores record keys.
pub(crate) struct KeyEscaper;

impl KeyEscaper {
    const REPLACEMENTS: [(&'static str, &'static str); 3] = [
        (".", "__dot__"),
        ("$", "__dollar__"),
        ("\0", "__null__"),
    ];

    pub(crate) fn escape_key(key: &str) -> String {
        let mut escaped = key.to_string();
        for (target, replacement) in Self::REPLACEMENTS.iter() {
            escaped = escaped.replace(target, replacement);
        }
        escaped
    }

    pub(crate) fn restore_key(key: &str) -> String {
        let mut restored = key.to_string();
        for (target, replacement) in Self::REPLACEMENTS.iter().rev() {
            restored = restored.replace(replacement, target);
        }
        restored
    }

    /// Escapes each segment of a dotted query path, keeping the dots that
    /// address nested fields.
    pub(crate) fn escape_path(path: &str) -> String {
        path.split('.')
            .map(Self::escape_key)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Escapes keys at every nesting level, including documents inside arrays.
    pub(crate) fn escape_record(record: &Document) -> Document {
        record
            .iter()
            .map(|(key, value)| (Self::escape_key(key), Self::map_value(value, Self::escape_record)))
            .collect()
    }

    /// Inverse of [`KeyEscaper::escape_record`].
    pub(crate) fn restore_record(record: &Document) -> Document {
        record
            .iter()
            .map(|(key, value)| (Self::restore_key(key), Self::map_value(value, Self::restore_record)))
            .collect()
    }

    fn map_value(value: &Bson, f: fn(&Document) -> Document) -> Bson {
        match value {
            Bson::Document(doc) => Bson::Document(f(doc)),
            Bson::Array(items) => Bson::Array(
                items
                    .iter()
                    .map(|item| Self::map_value(item, f))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}
