//! Field accumulation for one catalog record.
//!
//! Vendor catalogs disagree on field names (`hotelId` vs `id` vs `code`,
//! `lng` vs `longitude`, nested `location`/`address` objects). Every key is
//! resolved through one alias table. When several aliases feed the same
//! field, the alias listed first in the table wins no matter where the key
//! appears in the object, so the streaming reader and the buffered path
//! agree.

use concierge_core::CatalogRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    HotelId,
    Name,
    City,
    Country,
    StarRating,
    Lat,
    Lng,
    Address,
}

/// Lower ranks win. Values read from nested objects rank after every
/// top-level alias.
pub(crate) type Rank = u8;

const NESTED_RANK: Rank = 32;

const HOTEL_ID: &[&str] = &["hotelid", "id", "hotelcode", "code"];
const NAME: &[&str] = &["name", "hotelname"];
const CITY: &[&str] = &["city", "cityname"];
const COUNTRY: &[&str] = &["countrycode", "countryiso", "country"];
const STAR_RATING: &[&str] = &["starrating", "stars", "star", "hotelrating", "rating"];
const LAT: &[&str] = &["lat", "latitude"];
const LNG: &[&str] = &["lng", "lon", "long", "longitude"];
const ADDRESS: &[&str] = &["address", "addressline", "address1", "line1", "street"];

const NESTED_CITY: &[&str] = &["name", "cityname", "code"];
const NESTED_COUNTRY: &[&str] = &["code", "iso", "isocode", "name"];

const TOP_LEVEL: &[(Field, &[&str])] = &[
    (Field::HotelId, HOTEL_ID),
    (Field::Name, NAME),
    (Field::City, CITY),
    (Field::Country, COUNTRY),
    (Field::StarRating, STAR_RATING),
    (Field::Lat, LAT),
    (Field::Lng, LNG),
    (Field::Address, ADDRESS),
];

/// Keys whose object value is read one level deep instead of skipped.
pub(crate) fn is_nested_key(key: &str) -> bool {
    matches!(
        canonical(key).as_str(),
        "location" | "geo" | "geocode" | "geolocation" | "coordinates" | "position" | "address"
            | "city" | "country"
    )
}

/// Resolve a (possibly nested) key to the record field it feeds and the
/// rank of the alias it matched.
pub(crate) fn resolve(parent: Option<&str>, key: &str) -> Option<(Field, Rank)> {
    let key = canonical(key);
    let (field, rank) = match parent.map(canonical).as_deref() {
        Some("city") => (Field::City, position(NESTED_CITY, &key)?),
        Some("country") => (Field::Country, position(NESTED_COUNTRY, &key)?),
        // Inside location/address objects an `id` or `name` is not the hotel's.
        Some(_) => match resolve_top(&key)? {
            (Field::HotelId | Field::Name, _) => return None,
            other => other,
        },
        None => return resolve_top(&key),
    };
    Some((field, rank.saturating_add(NESTED_RANK)))
}

fn resolve_top(key: &str) -> Option<(Field, Rank)> {
    TOP_LEVEL
        .iter()
        .find_map(|(field, aliases)| position(aliases, key).map(|rank| (*field, rank)))
}

fn position(aliases: &[&str], key: &str) -> Option<Rank> {
    aliases
        .iter()
        .position(|alias| *alias == key)
        .and_then(|i| Rank::try_from(i).ok())
}

/// Lower-case and drop `_`/`-` so `hotel_id`, `hotelId` and `HOTEL-ID` agree.
fn canonical(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// One field's best value so far.
#[derive(Debug)]
struct Slot<T>(Option<(Rank, T)>);

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T> Slot<T> {
    /// Keep `value` unless an equal or better alias already filled the slot.
    fn offer(&mut self, rank: Rank, value: impl FnOnce() -> Option<T>) {
        if self.0.as_ref().is_some_and(|(held, _)| *held <= rank) {
            return;
        }
        if let Some(value) = value() {
            self.0 = Some((rank, value));
        }
    }

    fn take(self) -> Option<T> {
        self.0.map(|(_, value)| value)
    }
}

/// Accumulates one record's fields until its closing brace is seen.
#[derive(Debug, Default)]
pub(crate) struct RecordFields {
    hotel_id: Slot<String>,
    name: Slot<String>,
    city: Slot<String>,
    country: Slot<String>,
    star_rating: Slot<f64>,
    lat: Slot<f64>,
    lng: Slot<f64>,
    address: Slot<String>,
}

impl RecordFields {
    /// Store a scalar value (already rendered as text) for `key`.
    pub(crate) fn absorb(&mut self, parent: Option<&str>, key: &str, value: &str) {
        let Some((field, rank)) = resolve(parent, key) else {
            return;
        };
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        let text = || Some(value.to_string());
        match field {
            Field::HotelId => self.hotel_id.offer(rank, text),
            Field::Name => self.name.offer(rank, text),
            Field::City => self.city.offer(rank, text),
            Field::Country => self.country.offer(rank, text),
            Field::Address => self.address.offer(rank, text),
            Field::StarRating => self.star_rating.offer(rank, || parse_leading_number(value)),
            Field::Lat => self.lat.offer(rank, || {
                value.parse::<f64>().ok().filter(|v| (-90.0..=90.0).contains(v))
            }),
            Field::Lng => self.lng.offer(rank, || {
                value.parse::<f64>().ok().filter(|v| (-180.0..=180.0).contains(v))
            }),
        }
    }

    /// Walk a buffered JSON object with the same rules the stream reader uses.
    pub(crate) fn absorb_value(&mut self, parent: Option<&str>, object: &serde_json::Value) {
        let Some(map) = object.as_object() else {
            return;
        };
        for (key, value) in map {
            match value {
                serde_json::Value::String(s) => self.absorb(parent, key, s),
                serde_json::Value::Number(n) => self.absorb(parent, key, &n.to_string()),
                serde_json::Value::Object(_) if parent.is_none() && is_nested_key(key) => {
                    self.absorb_value(Some(key), value);
                }
                _ => {}
            }
        }
    }

    /// Finish the record. The id may be empty; acceptance decides what to do
    /// with id-less records.
    pub(crate) fn into_record(self) -> CatalogRecord {
        CatalogRecord {
            hotel_id: self.hotel_id.take().unwrap_or_default(),
            name: self.name.take().unwrap_or_default(),
            city: self.city.take(),
            country: self.country.take(),
            star_rating: self.star_rating.take(),
            lat: self.lat.take(),
            lng: self.lng.take(),
            address: self.address.take(),
        }
    }
}

/// `"4"`, `"4.5"`, `"4 stars"` and `"4EST"` all yield a rating.
fn parse_leading_number(raw: &str) -> Option<f64> {
    let end = raw
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map_or(raw.len(), |(i, _)| i);
    raw[..end]
        .parse::<f64>()
        .ok()
        .filter(|v| (0.0..=5.0).contains(v))
}
