// Update-operator interpreter and query matching shared by both stores.
mod cursor;
mod eval;
mod parse;
mod types;
mod update;

pub use cursor::Cursor;
pub use eval::{distinct_values, element_matches, matches, values_equal};
pub use parse::parse_query_json;
pub use types::{
    DeleteResult, InsertManyResult, InsertOneResult, UpdateOptions, UpdateOutcome, UpdateResult,
    UpdateSpec,
};
pub use update::{apply_update, upsert_seed};
