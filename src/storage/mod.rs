pub mod backend;
pub mod memory;
pub mod statement;
pub mod table;

pub use backend::StorageBackend;
pub use memory::MemoryBackend;
pub use statement::{Condition, Filter, PreparedStatement, Statement, quote_ident};
pub use table::{Table, TableSchema};
