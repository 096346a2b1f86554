use super::field::{FieldKind, FieldSpec};
use crate::access::ObjectPolicy;
use crate::core::{Column, DataType, ObjectError, ObjectResult};
use crate::storage::TableSchema;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// How rows of an entity are identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySpec {
    /// One auto-incrementing integer column.
    Primary(&'static str),
    /// Several declared fields that together form the primary key.
    Composite(Vec<&'static str>),
}

impl From<&'static str> for KeySpec {
    fn from(column: &'static str) -> Self {
        Self::Primary(column)
    }
}

impl<const N: usize> From<[&'static str; N]> for KeySpec {
    fn from(columns: [&'static str; N]) -> Self {
        Self::Composite(columns.to_vec())
    }
}

/// Declared shape of one entity type: table, key, fields and policy.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    pub type_name: &'static str,
    pub table: &'static str,
    pub key: KeySpec,
    pub fields: Vec<FieldSpec>,
    pub timestamp_field: Option<&'static str>,
    pub owner_field: Option<&'static str>,
    pub policy: ObjectPolicy,
}

impl EntityDescriptor {
    pub fn new(type_name: &'static str, table: &'static str, key: impl Into<KeySpec>) -> Self {
        Self {
            type_name,
            table,
            key: key.into(),
            fields: Vec::new(),
            timestamp_field: None,
            owner_field: None,
            policy: ObjectPolicy::open(),
        }
    }

    pub fn field(mut self, name: &'static str, spec: FieldSpec) -> Self {
        self.fields.push(spec.named(name));
        self
    }

    /// Column stamped with the time of every create and write.
    pub fn timestamp(mut self, name: &'static str) -> Self {
        self.timestamp_field = Some(name);
        self
    }

    /// Integer field holding the id of the user that created the row.
    pub fn owner(mut self, name: &'static str) -> Self {
        self.owner_field = Some(name);
        self
    }

    pub fn policy(mut self, policy: ObjectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.find_field(name).is_some()
    }

    /// Single primary key column, if the entity has one.
    pub fn primary_key(&self) -> Option<&'static str> {
        match &self.key {
            KeySpec::Primary(column) => Some(column),
            KeySpec::Composite(_) => None,
        }
    }

    pub fn key_columns(&self) -> Vec<&'static str> {
        match &self.key {
            KeySpec::Primary(column) => vec![*column],
            KeySpec::Composite(columns) => columns.clone(),
        }
    }

    pub fn is_timestamp(&self, name: &str) -> bool {
        self.timestamp_field == Some(name)
    }

    /// Spec for any column of the table, including the primary key and the
    /// timestamp column.
    pub fn column_spec(&self, name: &str) -> Option<FieldSpec> {
        if let Some(spec) = self.find_field(name) {
            return Some(spec.clone());
        }
        if let Some(key) = self.primary_key().filter(|key| *key == name) {
            return Some(FieldSpec::integer().named(key));
        }
        self.timestamp_field
            .filter(|ts| *ts == name)
            .map(|ts| FieldSpec::timestamp().nullable().named(ts))
    }

    /// Every column in table order: primary key, declared fields, timestamp.
    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = Vec::with_capacity(self.fields.len() + 2);
        if let Some(key) = self.primary_key() {
            columns.push(key);
        }
        columns.extend(self.fields.iter().map(|spec| spec.name));
        if let Some(ts) = self.timestamp_field {
            columns.push(ts);
        }
        columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns().iter().position(|column| *column == name)
    }

    pub fn unique_fields(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|spec| spec.unique)
            .map(|spec| spec.name)
            .collect()
    }

    /// Rejects malformed declarations before any DDL is generated.
    pub fn validate(&self) -> ObjectResult<()> {
        let fail = |reason: String| ObjectError::InvalidSchema {
            entity: self.type_name,
            reason,
        };

        if !IDENTIFIER.is_match(self.table) {
            return Err(fail(format!("invalid table name '{}'", self.table)));
        }

        let mut seen = HashSet::new();
        for column in self.columns() {
            if !IDENTIFIER.is_match(column) {
                return Err(fail(format!("invalid column name '{}'", column)));
            }
            if !seen.insert(column) {
                return Err(fail(format!("column '{}' declared twice", column)));
            }
        }

        for spec in &self.fields {
            if let FieldKind::Enum(options) = &spec.kind
                && options.is_empty()
            {
                return Err(fail(format!("enum field '{}' has no options", spec.name)));
            }
        }

        if let Some(owner) = self.owner_field {
            match self.find_field(owner) {
                Some(spec) if spec.kind == FieldKind::Integer => {}
                Some(_) => {
                    return Err(fail(format!("owner field '{}' must be an integer", owner)));
                }
                None => {
                    return Err(fail(format!("owner field '{}' is not declared", owner)));
                }
            }
        }

        if let KeySpec::Composite(columns) = &self.key {
            if columns.is_empty() {
                return Err(fail("composite key has no columns".to_string()));
            }
            for column in columns {
                if !self.is_declared(column) {
                    return Err(fail(format!("key column '{}' is not declared", column)));
                }
            }
        }

        Ok(())
    }

    /// Table layout handed to storage backends.
    pub fn table_schema(&self) -> TableSchema {
        let mut columns = Vec::with_capacity(self.fields.len() + 2);
        if let Some(key) = self.primary_key() {
            columns.push(Column::new(key, DataType::Integer).not_null().auto_increment());
        }
        columns.extend(self.fields.iter().map(FieldSpec::to_column));
        if let Some(ts) = self.timestamp_field {
            columns.push(Column::new(ts, DataType::Timestamp));
        }

        let to_owned = |names: Vec<&'static str>| names.into_iter().map(String::from).collect();
        TableSchema::new(self.table, columns)
            .with_primary_key(to_owned(self.key_columns()))
            .with_unique_key(to_owned(self.unique_fields()))
    }
}
