use std::{fs, path::Path, time::Duration};

use reqwest::{Client as HttpClient, ClientBuilder, header::HeaderMap};
use tracing::{debug, warn};

use crate::config::Config;
use crate::retry::{new_backoff_limited, retry};

use super::{FeeEstimator, error::Error, types::FeeRates};

#[derive(Clone, Debug)]
pub struct Client {
    client: HttpClient,
    url: String,
}

/// Reads the single opaque token stored in the local, unversioned secrets file.
pub fn read_api_key(path: &Path) -> Result<String, Error> {
    if !path.exists() {
        return Err(Error::MissingApiKey(path.to_path_buf()));
    }
    let api_key = fs::read_to_string(path)?.trim().to_string();
    if api_key.is_empty() {
        return Err(Error::EmptyApiKey(path.to_path_buf()));
    }
    Ok(api_key)
}

impl Client {
    pub fn new(url: String, api_key: String, timeout: Duration) -> Result<Self, Error> {
        let client = ClientBuilder::new()
            .default_headers({
                let mut headers = HeaderMap::new();
                headers.insert("x-api-key", api_key.parse()?);
                headers.insert("Accept", "application/json".parse()?);
                headers
            })
            .timeout(timeout)
            .build()?;

        Ok(Client { client, url })
    }

    pub fn new_from_config(config: &Config) -> Result<Self, Error> {
        Client::new(
            config.fee_api_url.clone(),
            read_api_key(&config.fee_api_key_path)?,
            Duration::from_secs(config.fee_api_timeout_secs),
        )
    }

    pub async fn get_recommended_fees(&self) -> Result<FeeRates, Error> {
        let fees = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json::<FeeRates>()
            .await?;
        Ok(fees)
    }
}

impl FeeEstimator for Client {
    async fn recommended_fees(&self) -> FeeRates {
        match retry(
            || self.get_recommended_fees(),
            "get recommended fees",
            new_backoff_limited(),
            Error::is_transient,
        )
        .await
        {
            Ok(fees) => {
                debug!("Recommended fees: {:?}", fees);
                fees
            }
            Err(e) => {
                warn!("Falling back to sample fee rates: {}", e);
                FeeRates::FALLBACK
            }
        }
    }
}
