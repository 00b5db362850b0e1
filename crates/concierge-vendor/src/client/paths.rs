//! Vendor endpoint paths.

pub const SEARCH: &str = "/search";
pub const AVAILABILITY: &str = "/availability";
pub const BOOK: &str = "/book";
pub const BOOKING_INFO: &str = "/bookinginfo";
pub const CATALOG: &str = "/hotels";
pub const DETAILS: &str = "/hoteldetails";

/// Paths that accept the short-lived search token.
///
/// The vendor rejects or misroutes search calls that carry a token, so the
/// token is sent only to the availability/booking family.
const TOKEN_PATHS: &[&str] = &[AVAILABILITY, BOOK, BOOKING_INFO];

/// `true` when a call to `path` may carry the search token.
#[must_use]
pub fn accepts_token(path: &str) -> bool {
    let normalized = path.split('?').next().unwrap_or(path).trim_end_matches('/');
    let normalized = if normalized.starts_with('/') {
        normalized.to_ascii_lowercase()
    } else {
        format!("/{}", normalized.to_ascii_lowercase())
    };
    TOKEN_PATHS.contains(&normalized.as_str())
}
