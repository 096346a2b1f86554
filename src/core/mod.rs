pub mod error;
pub mod types;
pub mod value;

pub use error::{DbError, Denial, ObjectError, ObjectResult, Result};
pub use types::{Column, Row, Schema};
pub use value::{DataType, Value, parse_timestamp};
