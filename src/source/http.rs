use reqwest::Client;

use crate::error::SourceError;

/// Download `url` and return the body. Any non-success status is an error.
pub async fn fetch_bytes(client: &Client, url: &str) -> Result<Vec<u8>, SourceError> {
    let http = |source| SourceError::Http {
        url: url.to_string(),
        source,
    };

    let response = client
        .get(url)
        .header("User-Agent", concat!("scc-risk/", env!("CARGO_PKG_VERSION")))
        .send()
        .await
        .map_err(http)?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let bytes = response.bytes().await.map_err(http)?;
    tracing::debug!(url, bytes = bytes.len(), "fetched remote dataset");
    Ok(bytes.to_vec())
}
