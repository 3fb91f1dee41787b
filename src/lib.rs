//! Structured search against a Swedish real-estate listings site:
//! location resolution, query building, page fetching through a rendering
//! backend, and best-effort field extraction from the returned markup.

pub mod detail_extractor;
pub mod error;
pub mod fetcher;
pub mod locations;
pub mod models;
pub mod query;
pub mod search_extractor;
pub mod sold_extractor;
pub mod strategies;

pub use error::{FinderError, Result};
pub use fetcher::{PageFetcher, RendererConfig};
pub use locations::LocationResolver;
pub use models::{
    ListingDetail, ListingSummary, LocationRef, SearchFilter, SoldListingSummary, NATIONWIDE_LABEL,
};
