pub mod catalog;
pub mod client;
pub mod codec;
pub mod error;
mod retry;
pub mod shapes;
pub mod types;

pub use catalog::{CatalogError, CatalogStream, ReaderStats, DEFAULT_CHANNEL_CAPACITY};
pub use client::{paths, RequestOptions, VendorClient};
pub use codec::ContentEncoding;
pub use error::VendorError;
pub use types::{SearchRequest, SearchResponse};
