//! Vendor data sync and curation pipeline.
//!
//! Composes the vendor gateway and the stores into the cache read-through,
//! the search sweep, streaming catalog ingestion and curation seeding.

pub mod cache;
pub mod curated;
pub mod error;
pub mod filter;
pub mod guard;
pub mod ingest;
pub mod rooms;
pub mod sampling;
pub mod search;
pub mod seeder;
pub mod vendor;

#[cfg(test)]
mod testing;

pub use cache::{mark_stale, Cache, CacheHit, Cached, Freshness};
pub use curated::{CuratedPage, CuratedReader};
pub use error::SyncError;
pub use guard::{SeedTrigger, SuppressReason, TriggerOutcome};
pub use ingest::{AbortReason, IngestReport, StreamIngestor, StreamOptions};
pub use rooms::normalize_rooms;
pub use search::{SearchError, SearchOrchestrator, SearchOutcome, SearchParams};
pub use seeder::{SeedMode, SeedOptions, SeedReport, SeedSettings, Seeder};
pub use vendor::HotelVendor;
