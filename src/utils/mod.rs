//! Utility modules: dev traces, fs utilities, logger, JSON/BSON conversion.
pub mod devlog;
pub mod fsutil;
#[cfg(feature = "remote")]
pub mod json;
pub mod logger;
// types and errors are exposed at crate root via #[path] to files in this folder.
