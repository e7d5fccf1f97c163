pub mod engine;
pub mod locator;
pub mod resolver;
pub mod watcher;

pub use crate::domain::model::{ItemKind, PriceQuote, RowEvent, RowKey};
pub use crate::domain::ports::{FieldStore, PriceSource, SnapshotStore};
pub use crate::utils::error::Result;
