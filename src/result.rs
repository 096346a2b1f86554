use crate::core::{Row, Value};

/// Outcome of one executed statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Rows touched by INSERT/UPDATE/DELETE.
    pub affected_rows: Option<usize>,
    /// Key generated by an AUTO_INCREMENT column on INSERT.
    pub last_insert_id: Option<i64>,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            affected_rows: None,
            last_insert_id: None,
        }
    }

    pub fn affected(count: usize) -> Self {
        Self {
            affected_rows: Some(count),
            ..Self::default()
        }
    }

    pub fn scalar(column: impl Into<String>, value: Value) -> Self {
        Self::new(vec![column.into()], vec![vec![value]])
    }

    pub fn with_last_insert_id(mut self, id: Option<i64>) -> Self {
        self.last_insert_id = id;
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn affected_rows(&self) -> Option<usize> {
        self.affected_rows
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// First column of the first row, if any.
    pub fn first_value(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }
}
