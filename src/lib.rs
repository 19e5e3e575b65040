//! nacre — the collection layer of an in-memory search engine.
//!
//! A [`Collection`] owns a typed schema, assigns monotonically increasing
//! sequence ids to ingested JSON documents, partitions them across a fixed
//! number of in-memory index shards, persists the raw documents in a
//! key-value [`Store`], and answers ranked, faceted, typo-tolerant
//! full-text queries with highlighted snippets.

pub mod collection;
pub mod config;
pub mod error;
pub mod highlight;
pub mod index;
pub mod models;
pub mod schema;
pub mod store;

pub use collection::Collection;
pub use config::{CollectionConfig, MAX_RESULTS, NUM_INDICES, SNIPPET_STR_ABOVE_LEN};
pub use error::{NacreError, Result};
pub use models::{
    FacetCount, FacetValueCount, SearchRequest, SearchResponse, SortBy, SortOrder, TokenOrder,
};
pub use schema::{Field, FieldType, Schema};
pub use store::{FjallStore, MemoryStore, Store};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
