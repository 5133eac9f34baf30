use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, PRAGMA};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use super::DatasetSource;
use crate::model::{DatasetDocument, DatasetIndex, DatasetInfo};
use crate::DataError;

/// Request timeout for dataset fetches
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches datasets from a web server
///
/// Every request bypasses HTTP caches: datasets are edited in place on the
/// server and a stale copy would silently disagree with annotations.
pub struct HttpSource {
    base_url: String,
    client: Client,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, DataError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(no_cache_headers())
            .build()?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of a file under the dataset root, with a cache-busting query
    fn url_for(&self, relative: &str) -> String {
        let separator = if relative.contains('?') { '&' } else { '?' };
        format!(
            "{}/{}{}t={}",
            self.base_url,
            relative.trim_start_matches('/'),
            separator,
            Utc::now().timestamp_millis()
        )
    }

    async fn fetch_json<T: DeserializeOwned>(&self, relative: &str) -> Result<T, DataError> {
        let url = self.url_for(relative);
        debug!(%url, "Fetching");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DataError::Other(format!("HTTP {} for {}", status, url)));
        }
        Ok(response.json::<T>().await?)
    }
}

fn no_cache_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

#[async_trait]
impl DatasetSource for HttpSource {
    async fn list_datasets(&self) -> Vec<DatasetInfo> {
        match self.fetch_json::<DatasetIndex>("index.json").await {
            Ok(index) => index.datasets,
            Err(err) => {
                warn!(base = %self.base_url, "Could not fetch dataset index: {}", err);
                Vec::new()
            }
        }
    }

    async fn load_dataset(&self, dataset: &DatasetInfo) -> Result<DatasetDocument, DataError> {
        self.fetch_json::<DatasetDocument>(&dataset.document_path())
            .await
            .map_err(|err| {
                error!(dataset = %dataset.id, "Failed to load dataset: {}", err);
                DataError::load(&dataset.id, err)
            })
    }

    fn source_name(&self) -> &str {
        &self.base_url
    }
}
