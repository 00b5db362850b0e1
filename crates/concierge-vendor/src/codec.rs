//! Response body decoding selected by `Content-Encoding`.
//!
//! The HTTP client is built without transparent decompression so the
//! catalog stream can decode incrementally; buffered calls share the same
//! decoders through [`ContentEncoding::decode_bytes`].

use std::io::{BufRead, BufReader, Read};

use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};

use crate::error::VendorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Gzip,
    Deflate,
}

impl ContentEncoding {
    /// Parse a `Content-Encoding` header value.
    ///
    /// # Errors
    ///
    /// Returns [`VendorError::Decompression`] for encodings we cannot decode
    /// (e.g. `br`), so the caller fails fast instead of parsing compressed bytes.
    pub fn from_header(value: Option<&str>) -> Result<Self, VendorError> {
        let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(ContentEncoding::Identity);
        };
        match raw.to_ascii_lowercase().as_str() {
            "identity" => Ok(ContentEncoding::Identity),
            "gzip" | "x-gzip" => Ok(ContentEncoding::Gzip),
            "deflate" => Ok(ContentEncoding::Deflate),
            other => Err(VendorError::Decompression {
                encoding: other.to_string(),
                message: "unsupported content encoding".to_string(),
            }),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentEncoding::Identity => "identity",
            ContentEncoding::Gzip => "gzip",
            ContentEncoding::Deflate => "deflate",
        }
    }

    /// Wrap `inner` in the matching streaming decoder.
    ///
    /// `deflate` bodies are usually zlib-wrapped but some servers send raw
    /// deflate; the first two bytes decide which decoder to use.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors raised while peeking the deflate header.
    pub fn decoder<R>(self, inner: R) -> std::io::Result<Box<dyn Read + Send>>
    where
        R: Read + Send + 'static,
    {
        Ok(match self {
            ContentEncoding::Identity => Box::new(inner),
            ContentEncoding::Gzip => Box::new(GzDecoder::new(inner)),
            ContentEncoding::Deflate => {
                let mut buffered = BufReader::new(inner);
                let head = buffered.fill_buf()?;
                if looks_like_zlib(head) {
                    Box::new(ZlibDecoder::new(buffered))
                } else {
                    Box::new(DeflateDecoder::new(buffered))
                }
            }
        })
    }

    /// Decode a fully buffered body.
    ///
    /// # Errors
    ///
    /// Returns [`VendorError::Decompression`] if the bytes are not valid for
    /// this encoding.
    pub fn decode_bytes(self, bytes: &[u8]) -> Result<Vec<u8>, VendorError> {
        if self == ContentEncoding::Identity {
            return Ok(bytes.to_vec());
        }
        let mut out = Vec::with_capacity(bytes.len().saturating_mul(4));
        self.decoder(std::io::Cursor::new(bytes.to_vec()))
            .and_then(|mut reader| reader.read_to_end(&mut out))
            .map_err(|e| VendorError::Decompression {
                encoding: self.as_str().to_string(),
                message: e.to_string(),
            })?;
        Ok(out)
    }
}

/// RFC 1950 header check: compression method 8 and a valid FCHECK.
fn looks_like_zlib(head: &[u8]) -> bool {
    match head {
        [cmf, flg, ..] => cmf & 0x0F == 8 && ((u16::from(*cmf) << 8) | u16::from(*flg)) % 31 == 0,
        _ => false,
    }
}
