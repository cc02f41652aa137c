//! Structural comparison between two versions of a record.
//!
//! [`diff`] classifies every field present in either record as unchanged,
//! changed, added or removed. Drivers turn the resulting [`ChangeSet`] into
//! a partial update so that fields nobody touched are never rewritten.

use bson::Bson;

use crate::document::RawRecord;

/// How a single field differs between the original and current record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Unchanged,
    Changed,
    /// Present only in the current record.
    Added,
    /// Present only in the original record. The field becomes undefined.
    Removed,
}

/// The comparison result for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: String,
    pub previous: Option<Bson>,
    pub current: Option<Bson>,
    pub status: ChangeStatus,
}

/// Field-level difference between two records.
///
/// Entries follow the original record's field order, then fields that only
/// exist in the current record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChangeSet {
    entries: Vec<FieldChange>,
    touches_primary_key: bool,
}

impl ChangeSet {
    /// True when every field is unchanged.
    pub fn is_empty(&self) -> bool {
        self.entries
            .iter()
            .all(|entry| entry.status == ChangeStatus::Unchanged)
    }

    /// Number of fields that are not unchanged.
    pub fn len(&self) -> usize {
        self.changes().count()
    }

    /// True when the primary-key field was changed, added or removed.
    ///
    /// Writes must still address the record by its original key, so callers
    /// treat this as an error rather than a rename.
    pub fn touches_primary_key(&self) -> bool {
        self.touches_primary_key
    }

    /// Every compared field, including unchanged ones.
    pub fn iter(&self) -> impl Iterator<Item = &FieldChange> {
        self.entries.iter()
    }

    /// Only the fields that differ.
    pub fn changes(&self) -> impl Iterator<Item = &FieldChange> {
        self.entries
            .iter()
            .filter(|entry| entry.status != ChangeStatus::Unchanged)
    }

    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.entries.iter().find(|entry| entry.field == field)
    }

    /// New values of changed and added fields.
    pub fn set_fields(&self) -> RawRecord {
        self.changes()
            .filter_map(|entry| {
                entry
                    .current
                    .clone()
                    .map(|value| (entry.field.clone(), value))
            })
            .collect()
    }

    /// Names of removed fields.
    pub fn unset_fields(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.status == ChangeStatus::Removed)
            .map(|entry| entry.field.as_str())
            .collect()
    }

    /// Applies the change set to `record` as a partial update.
    ///
    /// Fields absent from the change set are left as they are in `record`.
    pub fn apply_to(&self, record: &mut RawRecord) {
        for entry in self.changes() {
            match &entry.current {
                Some(value) => {
                    record.insert(entry.field.clone(), value.clone());
                }
                None => {
                    record.remove(&entry.field);
                }
            }
        }
    }
}

/// Computes the change set that turns `original` into `current`.
///
/// `primary_key` names the field holding the record identity; modifications
/// to it are flagged on the result.
pub fn diff(original: &RawRecord, current: &RawRecord, primary_key: Option<&str>) -> ChangeSet {
    let mut entries = Vec::with_capacity(original.len().max(current.len()));

    for (field, previous) in original {
        let (current_value, status) = match current.get(field) {
            Some(value) if values_equal(previous, value) => (Some(value.clone()), ChangeStatus::Unchanged),
            Some(value) => (Some(value.clone()), ChangeStatus::Changed),
            None => (None, ChangeStatus::Removed),
        };

        entries.push(FieldChange {
            field: field.clone(),
            previous: Some(previous.clone()),
            current: current_value,
            status,
        });
    }

    for (field, value) in current {
        if !original.contains_key(field) {
            entries.push(FieldChange {
                field: field.clone(),
                previous: None,
                current: Some(value.clone()),
                status: ChangeStatus::Added,
            });
        }
    }

    let touches_primary_key = primary_key.is_some_and(|key| {
        entries
            .iter()
            .any(|entry| entry.field == key && entry.status != ChangeStatus::Unchanged)
    });

    ChangeSet { entries, touches_primary_key }
}

/// Structural equality for BSON values.
///
/// Integers and doubles compare numerically, documents compare key-wise
/// regardless of field order, and arrays compare element-wise.
pub fn values_equal(left: &Bson, right: &Bson) -> bool {
    match (left, right) {
        (Bson::Document(a), Bson::Document(b)) => {
            a.len() == b.len()
                && a.iter().all(|(key, value)| {
                    b.get(key)
                        .is_some_and(|other| values_equal(value, other))
                })
        }
        (Bson::Array(a), Bson::Array(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(x, y)| values_equal(x, y))
        }
        (Bson::Double(a), Bson::Double(b)) => a == b,
        (Bson::Double(_), _) | (_, Bson::Double(_)) => match (as_f64(left), as_f64(right)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        _ => match (as_i64(left), as_i64(right)) {
            (Some(a), Some(b)) => a == b,
            _ => left == right,
        },
    }
}

fn as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(n) => Some(i64::from(*n)),
        Bson::Int64(n) => Some(*n),
        _ => None,
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(n) => Some(*n),
        other => as_i64(other).map(|n| n as f64),
    }
}
