//! Catalog access: column metadata, key maxima and sequence state.

pub mod adapter;
pub mod options;
pub mod postgres;

pub use adapter::{Catalog, SequenceInfo};
pub use options::CatalogOptions;
pub use postgres::PostgresCatalog;

pub use tabload_core::TableSchema;
