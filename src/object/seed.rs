use super::entity::Entity;
use super::record::{Record, SetOutcome};
use crate::core::{ObjectError, ObjectResult, Value};
use crate::deps::Dependencies;
use crate::schema::FieldKind;
use tracing::{Instrument, Level, event, info_span};

impl<E: Entity> Record<E> {
    /// Rebuilds the table from `E::demo_data()`, skipping permission checks.
    /// Returns the number of rows created.
    pub async fn seed_demo(deps: &Dependencies) -> ObjectResult<usize> {
        let span = info_span!("object.seed", entity = E::type_name());
        async move {
            let mut records = Self::demo_records(deps)?;

            Self::drop_table(deps).await?;
            Self::initialize(deps).await?;
            for record in records.iter_mut() {
                record.insert().await?;
            }

            event!(Level::INFO, rows = records.len(), "demo data loaded");
            Ok(records.len())
        }
        .instrument(span)
        .await
    }

    // Every row is built and checked before the table is touched.
    fn demo_records(deps: &Dependencies) -> ObjectResult<Vec<Self>> {
        let rows = Self::demo_rows()?;
        let mut records = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            let mut record = Self::new(deps.clone());
            for (field, json) in row {
                let value = Self::demo_value(field, json);
                match record.set_key(field, value) {
                    SetOutcome::Changed | SetOutcome::Unchanged => {}
                    other => {
                        return Err(ObjectError::DemoData {
                            entity: E::type_name(),
                            reason: format!("row {} field '{}': {:?}", index, field, other),
                        });
                    }
                }
            }
            records.push(record);
        }
        Ok(records)
    }

    fn demo_rows() -> ObjectResult<Vec<serde_json::Map<String, serde_json::Value>>> {
        let malformed = |reason: String| ObjectError::DemoData {
            entity: E::type_name(),
            reason,
        };
        let parsed: serde_json::Value =
            serde_json::from_str(E::demo_data()).map_err(|err| malformed(err.to_string()))?;
        let serde_json::Value::Array(items) = parsed else {
            return Err(malformed("expected a JSON array".to_string()));
        };
        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                serde_json::Value::Object(row) => Ok(row),
                _ => Err(malformed(format!("row {} is not an object", index))),
            })
            .collect()
    }

    // JSON has no datetime type; timestamp fields arrive as text.
    fn demo_value(field: &str, json: &serde_json::Value) -> Value {
        let value = Value::from_json(json);
        match E::descriptor().find_field(field) {
            Some(spec) if spec.kind == FieldKind::Timestamp => spec.kind.coerce(value),
            _ => value,
        }
    }
}
