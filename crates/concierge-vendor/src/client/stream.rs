//! Long-lived catalog response feeding the pull parser.

use futures::{StreamExt, TryStreamExt};
use reqwest::header::CONTENT_ENCODING;
use reqwest::Method;
use tokio_util::io::{StreamReader, SyncIoBridge};
use tokio_util::sync::CancellationToken;

use super::{paths, transport_error, VendorClient};
use crate::catalog::{CatalogStream, DEFAULT_CHANNEL_CAPACITY};
use crate::codec::ContentEncoding;
use crate::error::VendorError;
use crate::retry::retry_with_backoff;

impl VendorClient {
    /// Opens the full catalog as an incrementally parsed record stream.
    ///
    /// Only the request up to the response headers is retried; once bytes
    /// flow, failures surface through the stream. Cancelling `cancel` ends
    /// the byte source and stops the parser.
    ///
    /// # Errors
    ///
    /// Returns a classified [`VendorError`] if the response cannot be opened
    /// or declares an encoding that cannot be decoded.
    pub async fn open_catalog_stream(
        &self,
        cancel: CancellationToken,
    ) -> Result<CatalogStream, VendorError> {
        let url = self.url(paths::CATALOG)?;
        let response = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move {
                let response = self
                    .authorized(Method::GET, url)
                    .send()
                    .await
                    .map_err(|e| transport_error(e, paths::CATALOG))?;
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(VendorError::from_status(
                        status.as_u16(),
                        paths::CATALOG,
                        &body,
                    ));
                }
                Ok(response)
            }
        })
        .await?;

        let encoding = ContentEncoding::from_header(
            response
                .headers()
                .get(CONTENT_ENCODING)
                .and_then(|v| v.to_str().ok()),
        )?;
        tracing::info!(
            encoding = encoding.as_str(),
            content_length = response.content_length(),
            "catalog stream opened"
        );

        let bytes = response
            .bytes_stream()
            .map_err(std::io::Error::other)
            .take_until(cancel.clone().cancelled_owned());
        let source = SyncIoBridge::new(StreamReader::new(Box::pin(bytes)));

        Ok(CatalogStream::spawn(
            source,
            encoding,
            DEFAULT_CHANNEL_CAPACITY,
            cancel,
        ))
    }
}
