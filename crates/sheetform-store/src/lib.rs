//! Stores keyed by spreadsheet ranges and labels.

pub mod error;
pub mod label_store;
pub mod range_store;
pub mod watchers;

pub use error::StoreError;
pub use label_store::LabelStore;
pub use range_store::RangeStore;
pub use watchers::{WatcherId, Watchers};
