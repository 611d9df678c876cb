pub mod config;
pub mod controller;
pub mod query;
pub mod store;
pub mod utils;

#[path = "utils/errors.rs"]
pub mod errors;
#[path = "utils/types.rs"]
pub mod types;

pub use config::{LogConfig, RemoteConfig, StoreConfig};
pub use controller::{ConnectionState, StoreController};
pub use errors::DbError;
pub use query::{
    Cursor, DeleteResult, InsertManyResult, InsertOneResult, UpdateOptions, UpdateOutcome,
    UpdateResult, UpdateSpec,
};
pub use store::{Collection, DocumentStore, LocalCollection, LocalStore};
#[cfg(feature = "remote")]
pub use store::{RemoteCollection, RemoteStore};
pub use types::{Backend, Document, Query};

/// Initializes logging from the `logging` section of `config`, falling back to the
/// `AKOKO_LOG_*` environment variables when the section is empty.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a logger is already installed.
pub fn init_logging(config: &StoreConfig) -> Result<(), Box<dyn std::error::Error>> {
    let l = &config.logging;
    if l.dir.is_none() && l.level.is_none() && l.retention.is_none() {
        return utils::logger::configure_from_env();
    }
    utils::logger::configure_logging(l.dir.as_deref(), l.level.as_deref(), l.retention)
}
