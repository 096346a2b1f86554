use super::statement::Filter;
use crate::core::{Column, DbError, Result, Row, Schema, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    name: String,
    schema: Schema,
    primary_key: Vec<String>,
    unique_keys: Vec<Vec<String>>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            schema: Schema::new(columns),
            primary_key: Vec::new(),
            unique_keys: Vec::new(),
        }
    }

    pub fn with_primary_key(mut self, columns: Vec<String>) -> Self {
        self.primary_key = columns;
        self
    }

    pub fn with_unique_key(mut self, columns: Vec<String>) -> Self {
        if !columns.is_empty() {
            self.unique_keys.push(columns);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    pub fn unique_keys(&self) -> &[Vec<String>] {
        &self.unique_keys
    }

    pub fn auto_increment_column(&self) -> Option<&Column> {
        self.schema.columns().iter().find(|col| col.auto_increment)
    }

    fn key_sets(&self) -> impl Iterator<Item = &Vec<String>> {
        std::iter::once(&self.primary_key)
            .filter(|key| !key.is_empty())
            .chain(self.unique_keys.iter())
    }
}

/// Rows of one table, kept in insertion order.
#[derive(Debug, Clone)]
pub struct Table {
    schema: TableSchema,
    ddl: String,
    rows: BTreeMap<usize, Row>,
    next_row_id: usize,
    next_auto_value: i64,
}

impl Table {
    pub fn new(schema: TableSchema, ddl: impl Into<String>) -> Self {
        Self {
            schema,
            ddl: ddl.into(),
            rows: BTreeMap::new(),
            next_row_id: 0,
            next_auto_value: 1,
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// DDL text the table was created from.
    pub fn ddl(&self) -> &str {
        &self.ddl
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Inserts one row. Returns the generated AUTO_INCREMENT value, if any.
    pub fn insert(&mut self, columns: &[String], values: &[Value]) -> Result<Option<i64>> {
        if columns.len() != values.len() {
            return Err(DbError::ExecutionError(format!(
                "Expected {} values, got {}",
                columns.len(),
                values.len()
            )));
        }

        let schema = self.schema.schema();
        let mut row: Row = vec![Value::Null; schema.column_count()];
        for (column, value) in columns.iter().zip(values) {
            let idx = self.column_index(column)?;
            row[idx] = value.clone();
        }

        let mut generated = None;
        let mut next_auto_value = self.next_auto_value;
        if let Some(idx) = schema.columns().iter().position(|col| col.auto_increment) {
            match &row[idx] {
                Value::Null => {
                    row[idx] = Value::Integer(next_auto_value);
                    generated = Some(next_auto_value);
                    next_auto_value += 1;
                }
                Value::Integer(explicit) => {
                    next_auto_value = next_auto_value.max(explicit + 1);
                }
                other => {
                    return Err(DbError::TypeMismatch(format!(
                        "AUTO_INCREMENT column expects INTEGER, got {}",
                        other.type_name()
                    )));
                }
            }
        }

        self.validate_row(&row)?;
        self.check_keys(&row, None)?;

        let id = self.next_row_id;
        self.next_row_id += 1;
        self.next_auto_value = next_auto_value;
        self.rows.insert(id, row);
        Ok(generated)
    }

    pub fn select(&self, filter: &Filter, order_by: Option<&str>) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        for row in self.rows.values() {
            if filter.matches(self.schema.name(), self.schema.schema(), row)? {
                rows.push(row.clone());
            }
        }

        if let Some(column) = order_by {
            let idx = self.column_index(column)?;
            let mut failure = None;
            rows.sort_by(|a, b| {
                a[idx].compare(&b[idx]).unwrap_or_else(|err| {
                    failure.get_or_insert(err);
                    std::cmp::Ordering::Equal
                })
            });
            if let Some(err) = failure {
                return Err(err);
            }
        }

        Ok(rows)
    }

    pub fn count(&self, filter: &Filter) -> Result<usize> {
        let mut count = 0;
        for row in self.rows.values() {
            if filter.matches(self.schema.name(), self.schema.schema(), row)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Largest non-NULL value of `column` among matching rows; NULL if none.
    pub fn max(&self, column: &str, filter: &Filter) -> Result<Value> {
        let idx = self.column_index(column)?;
        let mut best = Value::Null;
        for row in self.rows.values() {
            if !filter.matches(self.schema.name(), self.schema.schema(), row)? {
                continue;
            }
            let candidate = &row[idx];
            if candidate.is_null() {
                continue;
            }
            if best.is_null() || candidate.compare(&best)? == std::cmp::Ordering::Greater {
                best = candidate.clone();
            }
        }
        Ok(best)
    }

    pub fn update(&mut self, assignments: &[(String, Value)], filter: &Filter) -> Result<usize> {
        let mut targets = Vec::new();
        for (id, row) in &self.rows {
            if filter.matches(self.schema.name(), self.schema.schema(), row)? {
                targets.push(*id);
            }
        }

        let mut resolved = Vec::with_capacity(assignments.len());
        for (column, value) in assignments {
            resolved.push((self.column_index(column)?, value.clone()));
        }

        let mut next_auto_value = self.next_auto_value;
        let auto_idx = self
            .schema
            .schema()
            .columns()
            .iter()
            .position(|col| col.auto_increment);

        let mut staged = Vec::with_capacity(targets.len());
        for id in &targets {
            let mut row = self.rows[id].clone();
            for (idx, value) in &resolved {
                row[*idx] = value.clone();
            }
            self.validate_row(&row)?;
            self.check_keys(&row, Some(*id))?;
            if let Some(idx) = auto_idx
                && let Value::Integer(v) = row[idx]
            {
                next_auto_value = next_auto_value.max(v + 1);
            }
            staged.push((*id, row));
        }

        for (id, row) in staged {
            self.rows.insert(id, row);
        }
        self.next_auto_value = next_auto_value;
        Ok(targets.len())
    }

    pub fn delete(&mut self, filter: &Filter) -> Result<usize> {
        let mut targets = Vec::new();
        for (id, row) in &self.rows {
            if filter.matches(self.schema.name(), self.schema.schema(), row)? {
                targets.push(*id);
            }
        }
        for id in &targets {
            self.rows.remove(id);
        }
        Ok(targets.len())
    }

    fn column_index(&self, column: &str) -> Result<usize> {
        self.schema
            .schema()
            .find_column_index(column)
            .ok_or_else(|| DbError::ColumnNotFound(column.to_string(), self.schema.name.clone()))
    }

    fn validate_row(&self, row: &Row) -> Result<()> {
        let columns = self.schema.schema().columns();
        if row.len() != columns.len() {
            return Err(DbError::ExecutionError(format!(
                "Expected {} columns, got {}",
                columns.len(),
                row.len()
            )));
        }
        for (column, value) in columns.iter().zip(row.iter()) {
            column.validate(value)?;
        }
        Ok(())
    }

    // A key tuple containing NULL never conflicts.
    fn check_keys(&self, row: &Row, ignore_id: Option<usize>) -> Result<()> {
        for key in self.schema.key_sets() {
            let mut indices = Vec::with_capacity(key.len());
            for column in key {
                indices.push(self.column_index(column)?);
            }
            if indices.iter().any(|idx| row[*idx].is_null()) {
                continue;
            }

            for (id, existing) in &self.rows {
                if Some(*id) == ignore_id {
                    continue;
                }
                if indices.iter().all(|idx| existing[*idx] == row[*idx]) {
                    let entry: Vec<String> = indices.iter().map(|idx| row[*idx].to_string()).collect();
                    return Err(DbError::ConstraintViolation(format!(
                        "Duplicate entry '{}' for key ({})",
                        entry.join("-"),
                        key.join(", ")
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DataType;

    fn screen_table() -> Table {
        let schema = TableSchema::new(
            "screen",
            vec![
                Column::new("intScreenID", DataType::Integer)
                    .not_null()
                    .auto_increment(),
                Column::new("strScreen", DataType::Text).not_null().max_length(255),
                Column::new("lastChange", DataType::Timestamp),
            ],
        )
        .with_primary_key(vec!["intScreenID".into()])
        .with_unique_key(vec!["strScreen".into()]);
        Table::new(schema, "")
    }

    fn insert_screen(table: &mut Table, name: &str) -> Result<Option<i64>> {
        table.insert(&["strScreen".to_string()], &[Value::from(name)])
    }

    #[test]
    fn test_auto_increment_assigns_sequential_keys() {
        let mut table = screen_table();
        assert_eq!(insert_screen(&mut table, "Base of Stairs").unwrap(), Some(1));
        assert_eq!(insert_screen(&mut table, "Top of Stairs").unwrap(), Some(2));

        table
            .insert(
                &["intScreenID".to_string(), "strScreen".to_string()],
                &[Value::Integer(10), Value::from("Lobby")],
            )
            .unwrap();
        assert_eq!(insert_screen(&mut table, "Kitchen").unwrap(), Some(11));
    }

    #[test]
    fn test_unique_key_rejects_duplicates() {
        let mut table = screen_table();
        insert_screen(&mut table, "Base of Stairs").unwrap();
        let err = insert_screen(&mut table, "Base of Stairs").unwrap_err();
        assert!(err.to_string().contains("Duplicate entry"));
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_failed_insert_does_not_consume_key() {
        let mut table = screen_table();
        insert_screen(&mut table, "Base of Stairs").unwrap();
        assert!(insert_screen(&mut table, "Base of Stairs").is_err());
        assert_eq!(insert_screen(&mut table, "Lobby").unwrap(), Some(2));
    }

    #[test]
    fn test_update_and_delete_by_filter() {
        let mut table = screen_table();
        insert_screen(&mut table, "A").unwrap();
        insert_screen(&mut table, "B").unwrap();

        let updated = table
            .update(
                &[("strScreen".to_string(), Value::from("C"))],
                &Filter::equals("intScreenID", 2i64),
            )
            .unwrap();
        assert_eq!(updated, 1);

        let conflict = table.update(
            &[("strScreen".to_string(), Value::from("A"))],
            &Filter::equals("intScreenID", 2i64),
        );
        assert!(conflict.is_err());

        assert_eq!(table.delete(&Filter::equals("intScreenID", 1i64)).unwrap(), 1);
        let rows = table.select(&Filter::all(), Some("intScreenID")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], Value::from("C"));
    }

    #[test]
    fn test_max_ignores_nulls() {
        let mut table = screen_table();
        insert_screen(&mut table, "A").unwrap();
        assert_eq!(table.max("lastChange", &Filter::all()).unwrap(), Value::Null);
        assert_eq!(
            table.max("intScreenID", &Filter::all()).unwrap(),
            Value::Integer(1)
        );
    }
}
