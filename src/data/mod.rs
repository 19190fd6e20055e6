//! Data module - CSV loading, cleaning and store-location join

mod cleaner;
mod joiner;
mod loader;

pub use cleaner::{
    Channel, CleanRecord, CleanerError, CleaningSummary, DataCleaner, ImputePolicy,
    MalformedDateError, OTHER,
};
pub use joiner::{EnrichedRecord, JoinError, StoreDirectory, StoreLocation, UNKNOWN_REGION};
pub use loader::{store_columns, tx_columns, LoaderError, RecordLoader};
