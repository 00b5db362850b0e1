//! Scripted collaborators shared by the unit tests in this crate.

use std::collections::{HashMap, VecDeque};
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use concierge_core::{CatalogRecord, FixedClock, HotelEnrichment};
use concierge_vendor::{
    CatalogStream, ContentEncoding, SearchRequest, SearchResponse, VendorError,
    DEFAULT_CHANNEL_CAPACITY,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::vendor::HotelVendor;

pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
}

pub(crate) fn record(id: &str, country: &str, city: &str) -> CatalogRecord {
    CatalogRecord {
        hotel_id: id.to_string(),
        name: format!("Hotel {id}"),
        city: Some(city.to_string()),
        country: Some(country.to_string()),
        star_rating: Some(5.0),
        lat: Some(25.0),
        lng: Some(55.0),
        address: None,
    }
}

pub(crate) fn hits(count: usize) -> SearchResponse {
    SearchResponse {
        token: Some("tok".to_string()),
        count,
        hotels: (0..count).map(|i| json!({"id": format!("H{i}")})).collect(),
    }
}

/// Serialize records as a vendor catalog document.
pub(crate) fn catalog_doc(records: &[CatalogRecord]) -> Vec<u8> {
    let hotels: Vec<_> = records
        .iter()
        .map(|r| {
            json!({
                "hotelId": r.hotel_id,
                "name": r.name,
                "city": r.city,
                "country": r.country,
                "stars": r.star_rating,
                "latitude": r.lat,
                "longitude": r.lng,
            })
        })
        .collect();
    serde_json::to_vec(&json!({"hotels": hotels})).unwrap()
}

/// Hands out `data` a few bytes per read, sleeping between reads.
pub(crate) struct SlowReader {
    data: Cursor<Vec<u8>>,
    chunk: usize,
    delay: Duration,
}

impl SlowReader {
    pub(crate) fn new(data: Vec<u8>, chunk: usize, delay: Duration) -> Self {
        Self {
            data: Cursor::new(data),
            chunk,
            delay,
        }
    }
}

impl Read for SlowReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        std::thread::sleep(self.delay);
        let len = buf.len().min(self.chunk);
        self.data.read(&mut buf[..len])
    }
}

pub(crate) enum StreamScript {
    Fast(Vec<u8>),
    Slow {
        doc: Vec<u8>,
        chunk: usize,
        delay: Duration,
    },
    OpenFails(u16),
}

#[derive(Default)]
pub(crate) struct ScriptedVendor {
    search_results: Mutex<VecDeque<Result<SearchResponse, VendorError>>>,
    pub(crate) searches: Mutex<Vec<SearchRequest>>,
    catalog: Mutex<Option<Result<Vec<CatalogRecord>, u16>>>,
    pub(crate) catalog_calls: Mutex<usize>,
    details: Mutex<HashMap<String, HotelEnrichment>>,
    pub(crate) detail_calls: Mutex<Vec<Vec<String>>>,
    stream: Mutex<Option<StreamScript>>,
    slow_fetch: Mutex<Option<(Arc<FixedClock>, chrono::Duration)>>,
}

impl ScriptedVendor {
    pub(crate) fn with_searches(
        results: Vec<Result<SearchResponse, VendorError>>,
    ) -> Self {
        Self {
            search_results: Mutex::new(results.into()),
            ..Self::default()
        }
    }

    pub(crate) fn with_catalog(records: Vec<CatalogRecord>) -> Self {
        let vendor = Self::default();
        vendor.set_catalog(Ok(records));
        vendor
    }

    pub(crate) fn with_stream(script: StreamScript) -> Self {
        let vendor = Self::default();
        *vendor.stream.lock().unwrap() = Some(script);
        vendor
    }

    /// `Err(status)` makes the catalog call fail with that server status.
    pub(crate) fn set_catalog(&self, catalog: Result<Vec<CatalogRecord>, u16>) {
        *self.catalog.lock().unwrap() = Some(catalog);
    }

    /// Advance `clock` by `by` on every catalog fetch.
    pub(crate) fn advance_clock_on_fetch(&self, clock: Arc<FixedClock>, by: chrono::Duration) {
        *self.slow_fetch.lock().unwrap() = Some((clock, by));
    }

    pub(crate) fn add_detail(&self, detail: HotelEnrichment) {
        self.details
            .lock()
            .unwrap()
            .insert(detail.hotel_id.clone(), detail);
    }

    pub(crate) fn search_nationalities(&self) -> Vec<String> {
        self.searches
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.nationality.clone())
            .collect()
    }
}

fn server_error(status: u16, path: &str) -> VendorError {
    VendorError::Server {
        status,
        path: path.to_string(),
    }
}

#[async_trait]
impl HotelVendor for ScriptedVendor {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, VendorError> {
        self.searches.lock().unwrap().push(request.clone());
        self.search_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SearchResponse::empty()))
    }

    async fn fetch_catalog(&self) -> Result<Vec<CatalogRecord>, VendorError> {
        *self.catalog_calls.lock().unwrap() += 1;
        if let Some((clock, by)) = self.slow_fetch.lock().unwrap().as_ref() {
            clock.advance(*by);
        }
        match self.catalog.lock().unwrap().clone() {
            Some(Ok(records)) => Ok(records),
            Some(Err(status)) => Err(server_error(status, "/hotels")),
            None => Ok(Vec::new()),
        }
    }

    async fn hotel_details(
        &self,
        hotel_ids: &[String],
    ) -> Result<Vec<HotelEnrichment>, VendorError> {
        self.detail_calls.lock().unwrap().push(hotel_ids.to_vec());
        let details = self.details.lock().unwrap();
        Ok(hotel_ids
            .iter()
            .filter_map(|id| details.get(id).cloned())
            .collect())
    }

    async fn open_catalog(&self, cancel: CancellationToken) -> Result<CatalogStream, VendorError> {
        match self.stream.lock().unwrap().take() {
            Some(StreamScript::Fast(doc)) => Ok(CatalogStream::spawn(
                Cursor::new(doc),
                ContentEncoding::Identity,
                DEFAULT_CHANNEL_CAPACITY,
                cancel,
            )),
            Some(StreamScript::Slow { doc, chunk, delay }) => Ok(CatalogStream::spawn(
                SlowReader::new(doc, chunk, delay),
                ContentEncoding::Identity,
                4,
                cancel,
            )),
            Some(StreamScript::OpenFails(status)) => Err(server_error(status, "/hotels")),
            None => Ok(CatalogStream::spawn(
                Cursor::new(br#"{"hotels":[]}"#.to_vec()),
                ContentEncoding::Identity,
                DEFAULT_CHANNEL_CAPACITY,
                cancel,
            )),
        }
    }
}
