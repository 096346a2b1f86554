// ============================================================================
// CampFire object layer
// ============================================================================

pub mod access;
pub mod cache;
pub mod config;
pub mod core;
pub mod deps;
pub mod glue;
pub mod hooks;
mod macros;
pub mod object;
pub mod result;
pub mod schema;
pub mod storage;

#[doc(hidden)]
pub use paste;

// Re-export main types for convenience
pub use access::{Actor, ObjectPolicy};
pub use cache::{LruObjectCache, ObjectCache};
pub use config::StoreConfig;
pub use core::{DataType, DbError, Denial, ObjectError, ObjectResult, Result, Value};
pub use deps::{Dependencies, DependencyRegistry};
pub use hooks::{NoopObserver, ObjectEvent, ObjectEventKind, ObjectObserver, ObserverSet};
pub use object::{Entity, LastChange, Record, Search, SetOutcome, WriteOutcome};
pub use result::QueryResult;
pub use schema::{EntityDescriptor, FieldSpec};
pub use storage::{MemoryBackend, StorageBackend};
