use super::entity::Entity;
use super::persist::run;
use super::record::Record;
use crate::core::ObjectResult;
use crate::deps::Dependencies;
use crate::schema::create_table_sql;
use crate::storage::Statement;
use tracing::{Instrument, Level, event, info_span};

impl<E: Entity> Record<E> {
    /// DDL for the entity's table under the configured engine options.
    pub fn create_table_sql(deps: &Dependencies) -> ObjectResult<String> {
        let descriptor = E::descriptor();
        descriptor.validate()?;
        let config = deps.config(E::type_name())?;
        Ok(create_table_sql(descriptor, &config.ddl_options()))
    }

    /// Creates the table if it does not exist yet.
    pub async fn initialize(deps: &Dependencies) -> ObjectResult<()> {
        let span = info_span!("object.initialize", entity = E::type_name());
        async move {
            let ddl = Self::create_table_sql(deps)?;
            let backend = deps.backend(E::type_name())?;
            let statement = Statement::CreateTable {
                schema: E::descriptor().table_schema(),
                ddl,
            };
            run(backend.as_ref(), &statement).await?;
            event!(Level::DEBUG, table = E::descriptor().table, "table ready");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Drops the table and every cached row of the entity.
    pub async fn drop_table(deps: &Dependencies) -> ObjectResult<()> {
        let backend = deps.backend(E::type_name())?;
        let cache = deps.cache(E::type_name())?;
        let statement = Statement::DropTable {
            table: E::descriptor().table.to_string(),
            if_exists: true,
        };
        run(backend.as_ref(), &statement).await?;
        let evicted = cache.clear_entity(E::type_name());
        event!(Level::DEBUG, evicted, "cache cleared");
        Ok(())
    }
}
