use super::descriptor::EntityDescriptor;
use crate::storage::quote_ident;

/// Engine-level table options appended to CREATE TABLE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdlOptions {
    pub engine: String,
    pub charset: Option<String>,
}

impl Default for DdlOptions {
    fn default() -> Self {
        Self {
            engine: "InnoDB".to_string(),
            charset: None,
        }
    }
}

/// MySQL CREATE TABLE statement for an entity.
///
/// Single-key entities get an `int NOT NULL AUTO_INCREMENT` key column.
/// All unique-flagged fields share one composite UNIQUE KEY.
pub fn create_table_sql(descriptor: &EntityDescriptor, options: &DdlOptions) -> String {
    let mut parts = Vec::with_capacity(descriptor.fields.len() + 4);

    if let Some(key) = descriptor.primary_key() {
        parts.push(format!("{} int NOT NULL AUTO_INCREMENT", quote_ident(key)));
    }
    for spec in &descriptor.fields {
        parts.push(spec.column_sql());
    }
    if let Some(ts) = descriptor.timestamp_field {
        parts.push(format!("{} datetime NULL", quote_ident(ts)));
    }

    let key_columns: Vec<String> = descriptor
        .key_columns()
        .into_iter()
        .map(quote_ident)
        .collect();
    parts.push(format!("PRIMARY KEY ({})", key_columns.join(", ")));

    let unique: Vec<String> = descriptor
        .unique_fields()
        .into_iter()
        .map(quote_ident)
        .collect();
    if !unique.is_empty() {
        parts.push(format!("UNIQUE KEY ({})", unique.join(", ")));
    }

    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {} ({}) ENGINE={}",
        quote_ident(descriptor.table),
        parts.join(", "),
        options.engine
    );
    if let Some(charset) = &options.charset {
        sql.push_str(&format!(" DEFAULT CHARSET={}", charset));
    }
    sql
}

pub fn drop_table_sql(descriptor: &EntityDescriptor) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(descriptor.table))
}
