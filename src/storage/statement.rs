//! Structured statements understood by every [`StorageBackend`](super::StorageBackend).
//!
//! SQL engines consume the rendered [`PreparedStatement`]; the in-memory
//! backend interprets the structure directly.

use super::TableSchema;
use crate::core::{DbError, Result, Row, Schema, Value};

/// Quotes an identifier MySQL-style.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column = value`, or `column IS NULL` when the value is NULL.
    Equals(String, Value),
    /// `column IS NOT NULL`.
    NotNull(String),
}

impl Condition {
    pub fn column(&self) -> &str {
        match self {
            Self::Equals(column, _) | Self::NotNull(column) => column,
        }
    }
}

/// Conjunction of conditions. An empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn equals(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(Condition::Equals(column.into(), value.into()))
    }

    pub fn not_null(column: impl Into<String>) -> Self {
        Self::all().and(Condition::NotNull(column.into()))
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, table: &str, schema: &Schema, row: &Row) -> Result<bool> {
        for condition in &self.conditions {
            let idx = schema.find_column_index(condition.column()).ok_or_else(|| {
                DbError::ColumnNotFound(condition.column().to_string(), table.to_string())
            })?;
            let cell = &row[idx];
            let hit = match condition {
                Condition::Equals(_, Value::Null) => cell.is_null(),
                Condition::Equals(_, expected) => cell == expected,
                Condition::NotNull(_) => !cell.is_null(),
            };
            if !hit {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn render(&self, params: &mut Vec<Value>) -> String {
        if self.conditions.is_empty() {
            return String::new();
        }
        let clauses: Vec<String> = self
            .conditions
            .iter()
            .map(|condition| match condition {
                Condition::Equals(column, Value::Null) => {
                    format!("{} IS NULL", quote_ident(column))
                }
                Condition::Equals(column, value) => {
                    params.push(value.clone());
                    format!("{} = ?", quote_ident(column))
                }
                Condition::NotNull(column) => format!("{} IS NOT NULL", quote_ident(column)),
            })
            .collect();
        format!(" WHERE {}", clauses.join(" AND "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Create-if-absent. `ddl` is the engine-specific text for SQL backends.
    CreateTable { schema: TableSchema, ddl: String },
    DropTable { table: String, if_exists: bool },
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<Value>,
    },
    Select {
        table: String,
        filter: Filter,
        order_by: Option<String>,
    },
    Count { table: String, filter: Filter },
    Max {
        table: String,
        column: String,
        filter: Filter,
    },
    Update {
        table: String,
        assignments: Vec<(String, Value)>,
        filter: Filter,
    },
    Delete { table: String, filter: Filter },
}

/// SQL text with `?` placeholders and the values bound to them, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn table(&self) -> &str {
        match self {
            Self::CreateTable { schema, .. } => schema.name(),
            Self::DropTable { table, .. }
            | Self::Insert { table, .. }
            | Self::Select { table, .. }
            | Self::Count { table, .. }
            | Self::Max { table, .. }
            | Self::Update { table, .. }
            | Self::Delete { table, .. } => table,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateTable { .. } => "CREATE TABLE",
            Self::DropTable { .. } => "DROP TABLE",
            Self::Insert { .. } => "INSERT",
            Self::Select { .. } => "SELECT",
            Self::Count { .. } => "COUNT",
            Self::Max { .. } => "MAX",
            Self::Update { .. } => "UPDATE",
            Self::Delete { .. } => "DELETE",
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Insert { .. } | Self::Update { .. } | Self::Delete { .. }
        )
    }

    pub fn prepare(&self) -> PreparedStatement {
        let mut params = Vec::new();
        let sql = match self {
            Self::CreateTable { ddl, .. } => ddl.clone(),
            Self::DropTable { table, if_exists } => format!(
                "DROP TABLE {}{}",
                if *if_exists { "IF EXISTS " } else { "" },
                quote_ident(table)
            ),
            Self::Insert {
                table,
                columns,
                values,
            } => {
                params.extend(values.iter().cloned());
                let names: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
                let marks = vec!["?"; values.len()].join(", ");
                format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    quote_ident(table),
                    names.join(", "),
                    marks
                )
            }
            Self::Select {
                table,
                filter,
                order_by,
            } => {
                let mut sql = format!(
                    "SELECT * FROM {}{}",
                    quote_ident(table),
                    filter.render(&mut params)
                );
                if let Some(column) = order_by {
                    sql.push_str(&format!(" ORDER BY {} ASC", quote_ident(column)));
                }
                sql
            }
            Self::Count { table, filter } => format!(
                "SELECT COUNT(*) FROM {}{}",
                quote_ident(table),
                filter.render(&mut params)
            ),
            Self::Max {
                table,
                column,
                filter,
            } => format!(
                "SELECT MAX({}) FROM {}{}",
                quote_ident(column),
                quote_ident(table),
                filter.render(&mut params)
            ),
            Self::Update {
                table,
                assignments,
                filter,
            } => {
                let sets: Vec<String> = assignments
                    .iter()
                    .map(|(column, value)| {
                        params.push(value.clone());
                        format!("{} = ?", quote_ident(column))
                    })
                    .collect();
                let where_clause = filter.render(&mut params);
                format!(
                    "UPDATE {} SET {}{}",
                    quote_ident(table),
                    sets.join(", "),
                    where_clause
                )
            }
            Self::Delete { table, filter } => format!(
                "DELETE FROM {}{}",
                quote_ident(table),
                filter.render(&mut params)
            ),
        };

        PreparedStatement { sql, params }
    }
}
