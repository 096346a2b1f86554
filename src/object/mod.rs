//! Generic persistent objects: dirty tracking, brokers, permission-gated
//! writes and demo seeding over any [`StorageBackend`](crate::storage::StorageBackend).

pub mod broker;
pub mod entity;
pub mod persist;
pub mod record;
mod seed;
mod table;

pub use broker::{LastChange, Search};
pub use entity::{AssignError, Entity, FieldValue};
pub use persist::WriteOutcome;
pub use record::{Record, SetOutcome};
