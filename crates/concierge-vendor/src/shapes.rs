//! Tolerant decoding of vendor payloads.
//!
//! Vendor responses arrive in a handful of envelopes depending on endpoint
//! version. Each decoder tries an ordered list of typed shapes and falls
//! through to the next on mismatch; when nothing fits it logs the mismatch
//! and returns an empty result.

use concierge_core::{CatalogRecord, HotelEnrichment};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::catalog::RecordFields;
use crate::error::VendorError;
use crate::types::SearchResponse;

/// Domain codes that mean "valid request, nothing matched".
pub const NO_RESULT_CODES: &[&str] = &["NO_RESULTS", "NO_AVAILABILITY", "NO_HOTELS_FOUND"];

/// Marker set on the normalized empty payload.
pub const NO_RESULTS_FLAG: &str = "no_results";

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: DomainError,
}

#[derive(Debug, Deserialize)]
struct DomainError {
    #[serde(deserialize_with = "code_as_string")]
    code: String,
    #[serde(default)]
    message: Option<String>,
}

fn code_as_string<'de, D>(de: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(de)? {
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Inspect a `200` body for an embedded domain error.
///
/// Returns `Ok(Some(empty))` for "no results" codes, `Ok(None)` for an
/// ordinary payload.
///
/// # Errors
///
/// Returns [`VendorError::Api`] for any other domain error code.
pub fn check_domain_status(path: &str, body: &Value) -> Result<Option<Value>, VendorError> {
    let Ok(envelope) = ErrorEnvelope::deserialize(body) else {
        return Ok(None);
    };
    let code = envelope.error.code.trim().to_ascii_uppercase();
    if NO_RESULT_CODES.contains(&code.as_str()) {
        tracing::debug!(path, code = %code, "vendor reported no results");
        return Ok(Some(empty_result()));
    }
    Err(VendorError::Api {
        code,
        path: path.to_owned(),
        message: envelope.error.message.unwrap_or_default(),
    })
}

/// The payload substituted for a "no results" response.
#[must_use]
pub fn empty_result() -> Value {
    json!({ "hotels": [], "count": 0, NO_RESULTS_FLAG: true })
}

/// `true` when `body` is the normalized "no results" payload.
#[must_use]
pub fn is_no_results(body: &Value) -> bool {
    body.get(NO_RESULTS_FLAG).and_then(Value::as_bool) == Some(true)
}

#[derive(Debug, Deserialize)]
struct FlatSearch {
    #[serde(default)]
    token: Option<String>,
    hotels: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct WrappedSearch {
    data: FlatSearch,
}

/// Decode a search response.
///
/// # Errors
///
/// Returns [`VendorError::Deserialize`] when the body matches no known
/// search shape. A search that cannot be read is not silently empty: the
/// orchestrator must not mistake it for "no results".
pub fn parse_search(body: Value) -> Result<SearchResponse, VendorError> {
    if is_no_results(&body) {
        return Ok(SearchResponse::empty());
    }
    let flat = match FlatSearch::deserialize(&body) {
        Ok(flat) => flat,
        Err(first) => match WrappedSearch::deserialize(&body) {
            Ok(wrapped) => wrapped.data,
            Err(_) => {
                return Err(VendorError::Deserialize {
                    context: "search response".to_string(),
                    source: first,
                })
            }
        },
    };
    Ok(SearchResponse {
        count: flat.hotels.len(),
        token: flat.token.filter(|t| !t.is_empty()),
        hotels: flat.hotels,
    })
}

#[derive(Debug, Deserialize)]
struct HotelsKey {
    hotels: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct DataHotels {
    data: HotelsKey,
}

#[derive(Debug, Deserialize)]
struct DataList {
    data: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ResultsList {
    results: Vec<Value>,
}

/// Locate the list of hotel objects in a buffered response.
fn hotel_list(context: &str, body: Value) -> Vec<Value> {
    if let Ok(v) = HotelsKey::deserialize(&body) {
        return v.hotels;
    }
    if let Ok(v) = DataHotels::deserialize(&body) {
        return v.data.hotels;
    }
    if let Ok(v) = DataList::deserialize(&body) {
        return v.data;
    }
    if let Ok(v) = ResultsList::deserialize(&body) {
        return v.results;
    }
    if let Value::Array(items) = body {
        return items;
    }
    tracing::warn!(
        context,
        top_level = %shape_summary(&body),
        "vendor payload matched no known shape; treating as empty"
    );
    Vec::new()
}

fn shape_summary(body: &Value) -> String {
    match body {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).take(8).collect();
            format!("object{{{}}}", keys.join(","))
        }
        Value::Array(_) => "array".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::Bool(_) => "bool".to_string(),
        Value::Null => "null".to_string(),
    }
}

/// Decode a fully buffered catalog into records, in source order.
#[must_use]
pub fn parse_catalog(body: Value) -> Vec<CatalogRecord> {
    hotel_list("catalog", body)
        .iter()
        .filter(|v| v.is_object())
        .map(|v| {
            let mut fields = RecordFields::default();
            fields.absorb_value(None, v);
            fields.into_record()
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailShape {
    #[serde(alias = "id", alias = "hotel_id", alias = "code", deserialize_with = "code_as_string")]
    hotel_id: String,
    #[serde(default, alias = "main_photo", alias = "mainPhoto")]
    hero_image: Option<String>,
    #[serde(default, alias = "images", alias = "photos")]
    image_list: Option<Vec<Value>>,
    #[serde(default, alias = "hotelDescription")]
    description: Option<String>,
    #[serde(default, alias = "facilities", alias = "amenities")]
    facility_list: Option<Vec<Value>>,
}

impl DetailShape {
    fn into_enrichment(self) -> HotelEnrichment {
        let hero_image = self.hero_image.filter(|s| !s.trim().is_empty()).or_else(|| {
            self.image_list
                .as_deref()
                .and_then(|images| images.iter().find_map(image_url))
        });
        HotelEnrichment {
            hotel_id: self.hotel_id,
            hero_image,
            description: self.description.filter(|s| !s.trim().is_empty()),
            facility_count: self
                .facility_list
                .map(|f| i32::try_from(f.len()).unwrap_or(i32::MAX)),
        }
    }
}

/// Images arrive either as bare URLs or as `{url}`/`{urlHd}` objects.
fn image_url(image: &Value) -> Option<String> {
    match image {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => ["url", "urlHd", "href", "src"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Decode a hotel-details response. Entries that do not fit the detail
/// shape are dropped individually.
#[must_use]
pub fn parse_details(body: Value) -> Vec<HotelEnrichment> {
    // Single-hotel endpoints return the object itself.
    let single = body
        .as_object()
        .is_some_and(|map| !map.contains_key("hotels") && !map.contains_key("data"));
    let items = if single {
        vec![body]
    } else {
        hotel_list("hotel details", body)
    };
    items
        .into_iter()
        .filter_map(|v| match DetailShape::deserialize(&v) {
            Ok(shape) => Some(shape.into_enrichment()),
            Err(e) => {
                tracing::debug!(error = %e, "skipping hotel detail entry with unexpected shape");
                None
            }
        })
        .collect()
}
