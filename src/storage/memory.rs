use super::{StorageBackend, Statement, Table};
use crate::core::{DbError, Result, Value};
use crate::result::QueryResult;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{Mutex, RwLock};
use tracing::{Level, event};

/// In-process backend that interprets statements directly.
///
/// Enforces column types, nullability, lengths, enum sets, primary and unique
/// keys, and AUTO_INCREMENT. Keeps a journal of every statement it executed.
pub struct MemoryBackend {
    tables: RwLock<HashMap<String, Table>>,
    last_insert_id: Mutex<Option<i64>>,
    journal: Mutex<Vec<Statement>>,
    pending_failure: Mutex<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            last_insert_id: Mutex::new(None),
            journal: Mutex::new(Vec::new()),
            pending_failure: Mutex::new(None),
        }
    }

    /// Makes the next `execute` call fail with an execution error.
    pub async fn inject_failure(&self, message: impl Into<String>) {
        *self.pending_failure.lock().await = Some(message.into());
    }

    /// Statements executed so far, oldest first. Failed statements included.
    pub async fn journal(&self) -> Vec<Statement> {
        self.journal.lock().await.clone()
    }

    pub async fn statement_count(&self) -> usize {
        self.journal.lock().await.len()
    }

    pub async fn table_exists(&self, name: &str) -> bool {
        self.tables.read().await.contains_key(name)
    }

    pub async fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn row_count(&self, table_name: &str) -> Result<usize> {
        let tables = self.tables.read().await;
        tables
            .get(table_name)
            .map(Table::row_count)
            .ok_or_else(|| DbError::TableNotFound(table_name.to_string()))
    }

    /// DDL the table was created with.
    pub async fn table_ddl(&self, table_name: &str) -> Result<String> {
        let tables = self.tables.read().await;
        tables
            .get(table_name)
            .map(|table| table.ddl().to_string())
            .ok_or_else(|| DbError::TableNotFound(table_name.to_string()))
    }

    async fn apply(&self, statement: &Statement) -> Result<QueryResult> {
        match statement {
            Statement::CreateTable { schema, ddl } => {
                let mut tables = self.tables.write().await;
                if !tables.contains_key(schema.name()) {
                    tables.insert(
                        schema.name().to_string(),
                        Table::new(schema.clone(), ddl.clone()),
                    );
                }
                Ok(QueryResult::empty())
            }
            Statement::DropTable { table, if_exists } => {
                let mut tables = self.tables.write().await;
                if tables.remove(table).is_none() && !*if_exists {
                    return Err(DbError::TableNotFound(table.clone()));
                }
                Ok(QueryResult::empty())
            }
            Statement::Insert {
                table,
                columns,
                values,
            } => {
                let mut tables = self.tables.write().await;
                let target = tables
                    .get_mut(table)
                    .ok_or_else(|| DbError::TableNotFound(table.clone()))?;
                let generated = target.insert(columns, values)?;
                if generated.is_some() {
                    *self.last_insert_id.lock().await = generated;
                }
                Ok(QueryResult::affected(1).with_last_insert_id(generated))
            }
            Statement::Select {
                table,
                filter,
                order_by,
            } => {
                let tables = self.tables.read().await;
                let target = tables
                    .get(table)
                    .ok_or_else(|| DbError::TableNotFound(table.clone()))?;
                let rows = target.select(filter, order_by.as_deref())?;
                Ok(QueryResult::new(
                    target.schema().schema().column_names(),
                    rows,
                ))
            }
            Statement::Count { table, filter } => {
                let tables = self.tables.read().await;
                let target = tables
                    .get(table)
                    .ok_or_else(|| DbError::TableNotFound(table.clone()))?;
                let count = target.count(filter)?;
                Ok(QueryResult::scalar("COUNT(*)", Value::Integer(count as i64)))
            }
            Statement::Max {
                table,
                column,
                filter,
            } => {
                let tables = self.tables.read().await;
                let target = tables
                    .get(table)
                    .ok_or_else(|| DbError::TableNotFound(table.clone()))?;
                let max = target.max(column, filter)?;
                Ok(QueryResult::scalar(format!("MAX({})", column), max))
            }
            Statement::Update {
                table,
                assignments,
                filter,
            } => {
                let mut tables = self.tables.write().await;
                let target = tables
                    .get_mut(table)
                    .ok_or_else(|| DbError::TableNotFound(table.clone()))?;
                Ok(QueryResult::affected(target.update(assignments, filter)?))
            }
            Statement::Delete { table, filter } => {
                let mut tables = self.tables.write().await;
                let target = tables
                    .get_mut(table)
                    .ok_or_else(|| DbError::TableNotFound(table.clone()))?;
                Ok(QueryResult::affected(target.delete(filter)?))
            }
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn execute(&self, statement: &Statement) -> Result<QueryResult> {
        self.journal.lock().await.push(statement.clone());
        event!(
            Level::DEBUG,
            kind = statement.kind(),
            table = statement.table(),
            "memory backend statement"
        );

        if let Some(message) = self.pending_failure.lock().await.take() {
            return Err(DbError::ExecutionError(message));
        }

        self.apply(statement).await
    }

    async fn last_insert_id(&self) -> Result<Option<i64>> {
        Ok(*self.last_insert_id.lock().await)
    }
}
