pub mod batch;
pub mod capabilities;
pub mod classify;
pub mod error;
pub mod expand;
pub mod record;

// Flat public surface for domain types and functions.
pub use batch::{transform, Batch};
pub use capabilities::{Capabilities, Variant};
pub use error::ConvertError;
pub use expand::{Bracket, OutputRow};
pub use record::{read_records, CsvField, ReadOptions, SourceRecord};
