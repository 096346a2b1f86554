use super::entity::Entity;
use super::persist::run;
use super::record::Record;
use crate::core::{ObjectError, ObjectResult, Value};
use crate::deps::Dependencies;
use crate::storage::{Filter, Statement};
use chrono::{DateTime, Utc};
use tracing::{Instrument, Level, event, info_span};

/// Column predicate for searches.
#[derive(Debug, Clone, PartialEq)]
pub enum Search {
    /// Any non-NULL value. Written `"%"` by callers.
    Any,
    Exactly(Value),
}

impl Search {
    pub const WILDCARD: &'static str = "%";

    fn filter(&self, column: &str) -> Filter {
        match self {
            Self::Any => Filter::not_null(column),
            Self::Exactly(value) => Filter::equals(column, value.clone()),
        }
    }
}

impl From<&str> for Search {
    fn from(text: &str) -> Self {
        if text == Self::WILDCARD {
            Self::Any
        } else {
            Self::Exactly(Value::from(text))
        }
    }
}

impl From<String> for Search {
    fn from(text: String) -> Self {
        Self::from(text.as_str())
    }
}

impl From<Value> for Search {
    fn from(value: Value) -> Self {
        Self::Exactly(value)
    }
}

impl From<i64> for Search {
    fn from(value: i64) -> Self {
        Self::Exactly(Value::Integer(value))
    }
}

impl From<bool> for Search {
    fn from(value: bool) -> Self {
        Self::Exactly(Value::Boolean(value))
    }
}

/// Most recent modification among a set of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastChange {
    /// The entity declares no timestamp field.
    NotTracked,
    /// No matching row carries a timestamp.
    Never,
    At(DateTime<Utc>),
}

impl<E: Entity> Record<E> {
    /// Loads one record by primary key, from the cache when possible.
    pub async fn broker_by_id(deps: &Dependencies, id: i64) -> ObjectResult<Option<Self>> {
        let descriptor = E::descriptor();
        let key = descriptor.primary_key().ok_or(ObjectError::NoPrimaryKey {
            entity: descriptor.type_name,
        })?;
        let span = info_span!("object.broker", entity = descriptor.type_name, key = id);

        async move {
            let cache = deps.cache(E::type_name())?;
            if let Some(cache_key) = Self::cache_key(Some(id))
                && let Some(row) = cache.get(&cache_key)
            {
                event!(Level::DEBUG, "cache hit");
                return Self::from_row(deps.clone(), row).map(Some);
            }
            event!(Level::DEBUG, "cache miss");

            let mut records = Self::fetch(deps, Filter::equals(key, id)).await?;
            Ok(if records.is_empty() {
                None
            } else {
                Some(records.swap_remove(0))
            })
        }
        .instrument(span)
        .await
    }

    /// Records whose `field` matches `search`, ordered by key.
    pub async fn broker_by_column_search(
        deps: &Dependencies,
        field: &str,
        search: impl Into<Search>,
    ) -> ObjectResult<Vec<Self>> {
        let filter = Self::search_filter(field, search.into())?;
        Self::fetch(deps, filter)
            .instrument(info_span!("object.broker", entity = E::type_name(), field))
            .await
    }

    pub async fn count_by_column_search(
        deps: &Dependencies,
        field: &str,
        search: impl Into<Search>,
    ) -> ObjectResult<usize> {
        let filter = Self::search_filter(field, search.into())?;
        Self::count(deps, filter).await
    }

    pub async fn last_change_by_column_search(
        deps: &Dependencies,
        field: &str,
        search: impl Into<Search>,
    ) -> ObjectResult<LastChange> {
        let filter = Self::search_filter(field, search.into())?;
        Self::latest(deps, filter).await
    }

    pub async fn broker_all(deps: &Dependencies) -> ObjectResult<Vec<Self>> {
        Self::fetch(deps, Filter::all())
            .instrument(info_span!("object.broker", entity = E::type_name()))
            .await
    }

    pub async fn count_all(deps: &Dependencies) -> ObjectResult<usize> {
        Self::count(deps, Filter::all()).await
    }

    pub async fn last_change_all(deps: &Dependencies) -> ObjectResult<LastChange> {
        Self::latest(deps, Filter::all()).await
    }

    // Text arguments are read as the column's declared kind, so "1" finds
    // integer key 1.
    fn search_filter(field: &str, search: Search) -> ObjectResult<Filter> {
        let Some(spec) = E::descriptor().column_spec(field) else {
            return Err(ObjectError::UnknownField {
                entity: E::type_name(),
                field: field.to_string(),
            });
        };
        let search = match search {
            Search::Exactly(value) => Search::Exactly(spec.kind.coerce(value)),
            Search::Any => Search::Any,
        };
        Ok(search.filter(field))
    }

    // Every fetched row is cached under its key.
    async fn fetch(deps: &Dependencies, filter: Filter) -> ObjectResult<Vec<Self>> {
        let descriptor = E::descriptor();
        let backend = deps.backend(E::type_name())?;
        let statement = Statement::Select {
            table: descriptor.table.to_string(),
            filter,
            order_by: descriptor.key_columns().first().map(|column| column.to_string()),
        };
        let rows = run(backend.as_ref(), &statement).await?.into_rows();

        let cache = deps.cache(E::type_name())?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let record = Self::from_row(deps.clone(), row)?;
            if let Some(key) = Self::cache_key(record.id) {
                cache.put(key, record.row());
            }
            records.push(record);
        }
        event!(Level::DEBUG, rows = records.len(), "records loaded");
        Ok(records)
    }

    async fn count(deps: &Dependencies, filter: Filter) -> ObjectResult<usize> {
        let backend = deps.backend(E::type_name())?;
        let statement = Statement::Count {
            table: E::descriptor().table.to_string(),
            filter,
        };
        let result = run(backend.as_ref(), &statement).await?;
        let count = result.first_value().and_then(Value::as_i64).unwrap_or(0);
        Ok(usize::try_from(count).unwrap_or(0))
    }

    async fn latest(deps: &Dependencies, filter: Filter) -> ObjectResult<LastChange> {
        let Some(column) = E::descriptor().timestamp_field else {
            return Ok(LastChange::NotTracked);
        };
        let backend = deps.backend(E::type_name())?;
        let statement = Statement::Max {
            table: E::descriptor().table.to_string(),
            column: column.to_string(),
            filter,
        };
        let result = run(backend.as_ref(), &statement).await?;
        Ok(match result.first_value().and_then(Value::as_timestamp) {
            Some(ts) => LastChange::At(ts),
            None => LastChange::Never,
        })
    }
}
