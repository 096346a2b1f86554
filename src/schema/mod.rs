//! Declarative entity schemas and the DDL generated from them.

pub mod ddl;
pub mod descriptor;
pub mod field;

pub use ddl::{DdlOptions, create_table_sql, drop_table_sql};
pub use descriptor::{EntityDescriptor, KeySpec};
pub use field::{FieldKind, FieldSpec};
