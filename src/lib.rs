// Media Catalog - Library Entry Point
// Indexes a tree of media files into a catalog and enriches the records.

pub mod catalog;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod events;
pub mod hash;
pub mod index;
pub mod maintain;
pub mod media;
pub mod metadata;

pub use catalog::{Catalog, PhotoRecord, SqliteCatalog};
pub use config::Config;
pub use error::{CatalogError, Result};
pub use index::{IndexOptions, IndexStatus, IndexSummary, Indexer, RunController};
pub use maintain::Enricher;
