//! Catalog tables and identity resolution.

pub mod resolver;
pub mod store;

pub use resolver::{normalize_name, resolve_identity, resolve_in, Resolution, Resolved};
pub use store::{stat_key, Catalog, CatalogEntry, CatalogTable, Labels};
