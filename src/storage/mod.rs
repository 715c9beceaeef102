//! Persistence: on-disk paths, schema migrations, and the usage store.

pub mod history_schema;
pub mod paths;
pub mod usage_store;

pub use history_schema::{DEFAULT_RETENTION_DAYS, run_migrations};
pub use paths::AppPaths;
pub use usage_store::UsageStore;
