use super::Statement;
use crate::core::Result;
use crate::result::QueryResult;
use async_trait::async_trait;

/// Connection to the relational store.
///
/// Each call is one autocommitted statement. Implementations for SQL engines
/// execute [`Statement::prepare`]; the core never looks past this trait.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn execute(&self, statement: &Statement) -> Result<QueryResult>;

    /// Key generated by the most recent INSERT on this connection.
    async fn last_insert_id(&self) -> Result<Option<i64>>;
}
