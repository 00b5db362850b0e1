//! The slice of the vendor gateway the pipeline depends on.
//!
//! [`VendorClient`] is the production implementation; tests substitute
//! scripted vendors.

use async_trait::async_trait;
use concierge_core::{CatalogRecord, HotelEnrichment};
use concierge_vendor::{CatalogStream, SearchRequest, SearchResponse, VendorClient, VendorError};
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait HotelVendor: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, VendorError>;

    async fn fetch_catalog(&self) -> Result<Vec<CatalogRecord>, VendorError>;

    async fn hotel_details(&self, hotel_ids: &[String])
        -> Result<Vec<HotelEnrichment>, VendorError>;

    async fn open_catalog(&self, cancel: CancellationToken) -> Result<CatalogStream, VendorError>;
}

#[async_trait]
impl HotelVendor for VendorClient {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, VendorError> {
        VendorClient::search(self, request).await
    }

    async fn fetch_catalog(&self) -> Result<Vec<CatalogRecord>, VendorError> {
        VendorClient::fetch_catalog(self).await
    }

    async fn hotel_details(
        &self,
        hotel_ids: &[String],
    ) -> Result<Vec<HotelEnrichment>, VendorError> {
        VendorClient::hotel_details(self, hotel_ids).await
    }

    async fn open_catalog(&self, cancel: CancellationToken) -> Result<CatalogStream, VendorError> {
        self.open_catalog_stream(cancel).await
    }
}
