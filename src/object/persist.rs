use super::entity::Entity;
use super::record::Record;
use crate::access::{Actor, authorize};
use crate::core::{ObjectError, ObjectResult};
use crate::hooks::{ObjectEvent, ObjectEventKind};
use crate::result::QueryResult;
use crate::storage::{StorageBackend, Statement};
use tracing::{Instrument, Level, event, info_span};

/// Result of a successful [`Record::write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Columns sent in the UPDATE.
    Written(Vec<&'static str>),
    /// Nothing was dirty; no statement was issued.
    Unchanged,
}

impl<E: Entity> Record<E> {
    /// Inserts the record. Every declared field is written, plus the key when
    /// it was set explicitly.
    pub async fn create(&mut self, actor: Option<&Actor>) -> ObjectResult<()> {
        let span = info_span!("object.create", entity = E::type_name());
        async move {
            if self.persisted {
                return Err(ObjectError::AlreadyPersisted {
                    entity: E::type_name(),
                });
            }
            self.check_permission(actor, false)?;
            self.insert().await
        }
        .instrument(span)
        .await
    }

    /// Updates the dirty columns of a persisted record, matching the row by
    /// its key as last loaded or written.
    pub async fn write(&mut self, actor: Option<&Actor>) -> ObjectResult<WriteOutcome> {
        let span = info_span!("object.write", entity = E::type_name(), key = %self.describe_key());
        async move {
            if !self.persisted {
                return Err(ObjectError::NotPersisted {
                    entity: E::type_name(),
                });
            }
            self.check_permission(actor, true)?;

            let stamp = Self::next_stamp();
            let changed: Vec<&'static str> = E::descriptor()
                .columns()
                .into_iter()
                .filter(|column| {
                    self.dirty.contains(column) || stamp.is_some_and(|(field, _)| field == *column)
                })
                .collect();
            if changed.is_empty() {
                event!(Level::DEBUG, "nothing to write");
                return Ok(WriteOutcome::Unchanged);
            }

            let backend = self.deps.backend(E::type_name())?;
            let cache = self.deps.cache(E::type_name())?;
            let observer = self.deps.observer(E::type_name())?;
            let assignments = changed
                .iter()
                .map(|column| (column.to_string(), self.outgoing_value(column, stamp)))
                .collect();
            let statement = Statement::Update {
                table: E::descriptor().table.to_string(),
                assignments,
                filter: self.key_filter(),
            };

            let result = run(backend.as_ref(), &statement).await?;
            if result.affected_rows() == Some(0) {
                return Err(ObjectError::RowMissing {
                    entity: E::type_name(),
                    key: self.describe_key(),
                });
            }

            if let Some((_, at)) = stamp {
                self.last_change = Some(at);
            }
            if self.old_id != self.id
                && let Some(old_key) = Self::cache_key(self.old_id)
            {
                cache.evict(&old_key);
            }
            if let Some(key) = Self::cache_key(self.id) {
                cache.put(key, self.row());
            }

            self.snapshot();
            let event = self.event(ObjectEventKind::Updated, changed.clone());
            observer.notify(&event).await;
            Ok(WriteOutcome::Written(changed))
        }
        .instrument(span)
        .await
    }

    /// Removes the row. The record is left detached with no key.
    pub async fn delete(&mut self, actor: Option<&Actor>) -> ObjectResult<()> {
        let span = info_span!("object.delete", entity = E::type_name(), key = %self.describe_key());
        async move {
            if !self.persisted {
                return Err(ObjectError::NotPersisted {
                    entity: E::type_name(),
                });
            }
            self.check_permission(actor, true)?;

            let backend = self.deps.backend(E::type_name())?;
            let cache = self.deps.cache(E::type_name())?;
            let observer = self.deps.observer(E::type_name())?;
            let statement = Statement::Delete {
                table: E::descriptor().table.to_string(),
                filter: self.key_filter(),
            };
            let result = run(backend.as_ref(), &statement).await?;
            if result.affected_rows() == Some(0) {
                return Err(ObjectError::RowMissing {
                    entity: E::type_name(),
                    key: self.describe_key(),
                });
            }

            if let Some(key) = Self::cache_key(self.old_id) {
                cache.evict(&key);
            }

            let event = self.event(ObjectEventKind::Deleted, Vec::new());
            self.persisted = false;
            self.id = None;
            self.old_id = None;
            self.dirty.clear();
            observer.notify(&event).await;
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Insert without a permission check. Used by `create` and demo seeding.
    pub(super) async fn insert(&mut self) -> ObjectResult<()> {
        let descriptor = E::descriptor();
        let backend = self.deps.backend(E::type_name())?;
        let cache = self.deps.cache(E::type_name())?;
        let observer = self.deps.observer(E::type_name())?;
        let stamp = Self::next_stamp();

        let columns: Vec<&'static str> = descriptor
            .columns()
            .into_iter()
            .filter(|column| descriptor.primary_key() != Some(*column) || self.id.is_some())
            .collect();
        let values = columns
            .iter()
            .map(|column| self.outgoing_value(column, stamp))
            .collect();
        let statement = Statement::Insert {
            table: descriptor.table.to_string(),
            columns: columns.iter().map(|column| column.to_string()).collect(),
            values,
        };

        let result = run(backend.as_ref(), &statement).await?;
        if descriptor.primary_key().is_some() && self.id.is_none() {
            self.id = match result.last_insert_id {
                Some(id) => Some(id),
                None => backend.last_insert_id().await?,
            };
        }

        if let Some((_, at)) = stamp {
            self.last_change = Some(at);
        }
        self.persisted = true;
        self.snapshot();
        if let Some(key) = Self::cache_key(self.id) {
            cache.put(key, self.row());
        }
        event!(Level::INFO, key = %self.describe_key(), "record created");
        let event = self.event(ObjectEventKind::Created, columns);
        observer.notify(&event).await;
        Ok(())
    }

    fn check_permission(&self, actor: Option<&Actor>, existing: bool) -> ObjectResult<()> {
        // Existing rows are owned by whoever owned them when loaded.
        let owner = if existing {
            self.owner(&self.old)
        } else {
            self.owner(&self.data)
        };
        authorize(&E::descriptor().policy, actor, owner).map_err(|denial| {
            event!(Level::WARN, denial = %denial, "permission denied");
            ObjectError::PermissionDenied {
                entity: E::type_name(),
                denial,
            }
        })
    }

    fn event(&self, kind: ObjectEventKind, changed: Vec<&'static str>) -> ObjectEvent {
        ObjectEvent {
            kind,
            entity: E::type_name(),
            key: self.describe_key(),
            changed,
            state: self.to_json(),
        }
    }
}

/// Executes one statement, logging backend failures before returning them.
pub(super) async fn run(
    backend: &dyn StorageBackend,
    statement: &Statement,
) -> ObjectResult<QueryResult> {
    backend.execute(statement).await.map_err(|err| {
        event!(
            Level::WARN,
            error = %err,
            kind = statement.kind(),
            table = statement.table(),
            "backend statement failed"
        );
        ObjectError::Backend(err)
    })
}
