pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::adapters::form::{InMemoryForm, LocalSnapshots};
pub use crate::adapters::http::HttpPriceSource;
pub use crate::config::profile::SyncProfile;
pub use crate::core::engine::{plan_reconcile, SyncEngine};
pub use crate::core::locator::FieldConvention;
pub use crate::utils::error::{Result, SyncError};
