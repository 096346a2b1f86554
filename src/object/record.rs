use super::entity::{AssignError, Entity};
use crate::cache::CacheKey;
use crate::core::{ObjectError, ObjectResult, Row, Value};
use crate::deps::Dependencies;
use crate::storage::{Condition, Filter};
use chrono::{DateTime, SubsecRound, Utc};
use std::collections::BTreeSet;

/// Result of [`Record::set_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    /// Value stored; the field is now dirty.
    Changed,
    /// Value equals the current one; nothing marked.
    Unchanged,
    /// Not a declared field or the primary key.
    UnknownField,
    /// The timestamp field is written by the store only.
    SystemManaged,
    /// Value violates the field declaration.
    InvalidValue(String),
}

impl SetOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed)
    }

    /// True for `Changed` and `Unchanged`.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Changed | Self::Unchanged)
    }
}

/// In-memory handle on one row of entity `E`.
///
/// Keeps the typed data, a snapshot taken at load or last successful write,
/// and the set of fields changed since then.
#[derive(Debug, Clone)]
pub struct Record<E: Entity> {
    pub(super) data: E,
    pub(super) old: E,
    pub(super) id: Option<i64>,
    pub(super) old_id: Option<i64>,
    pub(super) last_change: Option<DateTime<Utc>>,
    pub(super) persisted: bool,
    pub(super) dirty: BTreeSet<&'static str>,
    pub(super) deps: Dependencies,
}

impl<E: Entity> Record<E> {
    pub fn new(deps: Dependencies) -> Self {
        Self::with_data(deps, E::default())
    }

    /// Unsaved record holding `data`. Nothing is marked dirty.
    pub fn with_data(deps: Dependencies, data: E) -> Self {
        Self {
            old: data.clone(),
            data,
            id: None,
            old_id: None,
            last_change: None,
            persisted: false,
            dirty: BTreeSet::new(),
            deps,
        }
    }

    pub fn data(&self) -> &E {
        &self.data
    }

    pub fn into_data(self) -> E {
        self.data
    }

    pub fn deps(&self) -> &Dependencies {
        &self.deps
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn last_change(&self) -> Option<DateTime<Utc>> {
        self.last_change
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn is_dirty(&self, field: &str) -> bool {
        self.dirty.contains(field)
    }

    pub fn dirty_fields(&self) -> Vec<&'static str> {
        self.dirty.iter().copied().collect()
    }

    /// Value of a declared field, the primary key or the timestamp field.
    pub fn get_key(&self, field: &str) -> Option<Value> {
        let descriptor = E::descriptor();
        if descriptor.primary_key() == Some(field) {
            return Some(Value::from(self.id));
        }
        if descriptor.is_timestamp(field) {
            return Some(Value::from(self.last_change));
        }
        self.data.field_value(field)
    }

    pub fn set_key(&mut self, field: &str, value: impl Into<Value>) -> SetOutcome {
        let descriptor = E::descriptor();
        let value = value.into();

        if descriptor.is_timestamp(field) {
            return SetOutcome::SystemManaged;
        }
        let Some(spec) = descriptor.column_spec(field) else {
            return SetOutcome::UnknownField;
        };
        if let Err(reason) = spec.accepts(&value) {
            return SetOutcome::InvalidValue(reason);
        }
        if self.get_key(field).as_ref() == Some(&value) {
            return SetOutcome::Unchanged;
        }

        if descriptor.primary_key() == Some(field) {
            self.id = value.as_i64();
        } else {
            match self.data.assign_field(field, value) {
                Ok(()) => {}
                Err(AssignError::Unknown) => return SetOutcome::UnknownField,
                Err(AssignError::Invalid(reason)) => return SetOutcome::InvalidValue(reason),
            }
        }
        self.dirty.insert(spec.name);
        SetOutcome::Changed
    }

    /// Every column as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        for column in E::descriptor().columns() {
            let value = self.get_key(column).unwrap_or(Value::Null);
            object.insert(column.to_string(), value.to_json());
        }
        serde_json::Value::Object(object)
    }

    /// Current values in table column order.
    pub fn row(&self) -> Row {
        E::descriptor()
            .columns()
            .into_iter()
            .map(|column| self.get_key(column).unwrap_or(Value::Null))
            .collect()
    }

    /// Rebuilds a persisted record from a row in table column order.
    pub fn from_row(deps: Dependencies, row: Row) -> ObjectResult<Self> {
        let descriptor = E::descriptor();
        let columns = descriptor.columns();
        if row.len() != columns.len() {
            return Err(ObjectError::InvalidSchema {
                entity: descriptor.type_name,
                reason: format!("expected {} columns, got {}", columns.len(), row.len()),
            });
        }

        let mut record = Self::new(deps);
        for (column, value) in columns.into_iter().zip(row) {
            let invalid = |reason: String| ObjectError::InvalidValue {
                entity: descriptor.type_name,
                field: column.to_string(),
                reason,
            };
            if descriptor.primary_key() == Some(column) {
                record.id = value.as_i64();
            } else if descriptor.is_timestamp(column) {
                record.last_change = value.as_timestamp();
            } else {
                match record.data.assign_field(column, value) {
                    Ok(()) => {}
                    Err(AssignError::Unknown) => return Err(invalid("not assignable".to_string())),
                    Err(AssignError::Invalid(reason)) => return Err(invalid(reason)),
                }
            }
        }

        record.persisted = true;
        record.snapshot();
        Ok(record)
    }

    pub(super) fn snapshot(&mut self) {
        self.old = self.data.clone();
        self.old_id = self.id;
        self.dirty.clear();
    }

    /// Timestamp column and the value the next statement will store in it.
    pub(super) fn next_stamp() -> Option<(&'static str, DateTime<Utc>)> {
        let field = E::descriptor().timestamp_field?;
        Some((field, Utc::now().trunc_subsecs(0)))
    }

    /// Column value as it will be sent, with a pending stamp applied.
    pub(super) fn outgoing_value(
        &self,
        column: &str,
        stamp: Option<(&'static str, DateTime<Utc>)>,
    ) -> Value {
        match stamp {
            Some((field, at)) if field == column => Value::Timestamp(at),
            _ => self.get_key(column).unwrap_or(Value::Null),
        }
    }

    pub(super) fn owner(&self, data: &E) -> Option<i64> {
        let field = E::descriptor().owner_field?;
        data.field_value(field).and_then(|value| value.as_i64())
    }

    /// Row key as of the last load or write.
    pub(super) fn snapshot_key(&self) -> Vec<(&'static str, Value)> {
        let descriptor = E::descriptor();
        match descriptor.primary_key() {
            Some(key) => vec![(key, Value::from(self.old_id))],
            None => descriptor
                .key_columns()
                .into_iter()
                .map(|column| (column, self.old.field_value(column).unwrap_or(Value::Null)))
                .collect(),
        }
    }

    pub(super) fn key_filter(&self) -> Filter {
        self.snapshot_key()
            .into_iter()
            .fold(Filter::all(), |filter, (column, value)| {
                filter.and(Condition::Equals(column.to_string(), value))
            })
    }

    pub(super) fn describe_key(&self) -> String {
        let parts: Vec<String> = self
            .snapshot_key()
            .into_iter()
            .map(|(_, value)| value.to_string())
            .collect();
        parts.join("-")
    }

    pub(super) fn cache_key(id: Option<i64>) -> Option<CacheKey> {
        E::descriptor().primary_key()?;
        id.map(|id| CacheKey::new(E::type_name(), id))
    }
}
