//! Pull parser that turns a catalog document into a lazy sequence of records.
//!
//! The document is never materialized. A small state machine walks the
//! token stream: it looks for the catalog array (top-level array, or an
//! array under a known key, optionally inside a `data`/`result` wrapper),
//! then reads one object at a time, emitting each record as soon as its
//! closing brace is consumed and dropping the accumulator before the next.

use std::io::Read;

use concierge_core::CatalogRecord;
use struson::reader::{JsonReader, JsonStreamReader, ReaderError, ValueType};

use super::fields::{is_nested_key, RecordFields};

/// Keys whose array value is the catalog.
const CATALOG_KEYS: &[&str] = &["hotels", "items", "results", "records", "data"];
/// Keys whose object value may contain the catalog array.
const WRAPPER_KEYS: &[&str] = &["data", "result", "response", "payload"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReaderState {
    AwaitingKey,
    InArray,
    InRecord,
    Finished,
}

pub(crate) struct CatalogReader<R: Read> {
    json: JsonStreamReader<R>,
    state: ReaderState,
    skipped: u64,
}

impl<R: Read> CatalogReader<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            json: JsonStreamReader::new(reader),
            state: ReaderState::AwaitingKey,
            skipped: 0,
        }
    }

    /// Non-object array entries skipped so far.
    pub(crate) fn skipped(&self) -> u64 {
        self.skipped
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> ReaderState {
        self.state
    }

    /// Pull the next record.
    ///
    /// Returns `Ok(None)` once the catalog array closes (or when the document
    /// has no catalog array). After an error the reader is finished.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`ReaderError`] for malformed JSON or I/O
    /// failures from the byte source.
    pub(crate) fn next_record(&mut self) -> Result<Option<CatalogRecord>, ReaderError> {
        let result = self.advance();
        if result.is_err() {
            self.state = ReaderState::Finished;
        }
        result
    }

    fn advance(&mut self) -> Result<Option<CatalogRecord>, ReaderError> {
        loop {
            match self.state {
                ReaderState::AwaitingKey => {
                    if self.seek_catalog_array()? {
                        self.state = ReaderState::InArray;
                    } else {
                        tracing::warn!("catalog document has no recognizable hotel array");
                        self.state = ReaderState::Finished;
                    }
                }
                ReaderState::InArray => {
                    if !self.json.has_next()? {
                        self.json.end_array()?;
                        self.state = ReaderState::Finished;
                        continue;
                    }
                    if self.json.peek()? != ValueType::Object {
                        self.json.skip_value()?;
                        self.skipped += 1;
                        continue;
                    }
                    self.json.begin_object()?;
                    self.state = ReaderState::InRecord;
                }
                ReaderState::InRecord => {
                    let mut fields = RecordFields::default();
                    self.read_fields(&mut fields, None)?;
                    self.json.end_object()?;
                    self.state = ReaderState::InArray;
                    return Ok(Some(fields.into_record()));
                }
                ReaderState::Finished => return Ok(None),
            }
        }
    }

    /// Position the reader just inside the catalog array.
    fn seek_catalog_array(&mut self) -> Result<bool, ReaderError> {
        match self.json.peek()? {
            ValueType::Array => {
                self.json.begin_array()?;
                return Ok(true);
            }
            ValueType::Object => self.json.begin_object()?,
            _ => return Ok(false),
        }

        loop {
            if !self.json.has_next()? {
                return Ok(false);
            }
            let name = self.json.next_name_owned()?;
            let key = name.to_ascii_lowercase();
            let kind = self.json.peek()?;
            if kind == ValueType::Array && CATALOG_KEYS.contains(&key.as_str()) {
                self.json.begin_array()?;
                return Ok(true);
            }
            if kind == ValueType::Object && WRAPPER_KEYS.contains(&key.as_str()) {
                self.json.begin_object()?;
                continue;
            }
            self.json.skip_value()?;
        }
    }

    /// Read the remaining members of the current object into `fields`.
    fn read_fields(
        &mut self,
        fields: &mut RecordFields,
        parent: Option<&str>,
    ) -> Result<(), ReaderError> {
        while self.json.has_next()? {
            let name = self.json.next_name_owned()?;
            match self.json.peek()? {
                ValueType::String => {
                    let value = self.json.next_string()?;
                    fields.absorb(parent, &name, &value);
                }
                ValueType::Number => {
                    let value = self.json.next_number_as_string()?;
                    fields.absorb(parent, &name, &value);
                }
                ValueType::Object if parent.is_none() && is_nested_key(&name) => {
                    self.json.begin_object()?;
                    self.read_fields(fields, Some(&name))?;
                    self.json.end_object()?;
                }
                _ => self.json.skip_value()?,
            }
        }
        Ok(())
    }
}
