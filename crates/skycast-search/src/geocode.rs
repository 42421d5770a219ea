//! Direct geocoding: turn a free-text query into candidate cities.
//! Uses the OpenWeather geocoding API, which requires an API key.

use crate::types::{to_city, City, GeoCandidate, GeocodeError};
use async_trait::async_trait;
use reqwest::Client;
use skycast_core::{NetworkError, ReqwestErrorExt, SearchConfig};
use std::sync::Arc;
use std::time::Duration;

const USER_AGENT: &str = "Skycast/0.1.0";

/// Anything that can resolve a query into cities
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<City>, GeocodeError>;
}

#[derive(Debug, Clone)]
pub struct GeocodingClient {
    client: Arc<Client>,
    base_url: String,
    api_key: Option<String>,
    locale: String,
    limit: usize,
    require_localized: bool,
}

impl GeocodingClient {
    pub fn new(config: &SearchConfig) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GeocodeError::Client(e.to_string()))?;

        let api_key = config
            .has_api_key()
            .then(|| config.api_key.clone())
            .flatten();

        Ok(Self {
            client: Arc::new(client),
            base_url: config.base_url.clone(),
            api_key,
            locale: config.locale.clone(),
            limit: config.result_limit,
            require_localized: config.require_localized_name,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl Geocoder for GeocodingClient {
    /// Search for cities matching `query`.
    ///
    /// Returns an empty list without touching the network when the query is
    /// blank or no API key is configured.
    async fn search(&self, query: &str) -> Result<Vec<City>, GeocodeError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let Some(api_key) = self.api_key.as_deref() else {
            tracing::debug!("Geocoding API key not configured, skipping lookup");
            return Ok(Vec::new());
        };

        let limit = self.limit.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("limit", limit.as_str()),
                ("appid", api_key),
                ("lang", self.locale.as_str()),
            ])
            .send()
            .await
            .map_err(|e| e.into_network_error())?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::debug!("Geocoding returned status {}", status);
            return Err(NetworkError::ServerError {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let candidates: Vec<GeoCandidate> = response
            .json()
            .await
            .map_err(|e| NetworkError::InvalidResponse(e.to_string()))?;

        let total = candidates.len();
        let cities: Vec<City> = candidates
            .into_iter()
            .filter_map(|raw| to_city(raw, &self.locale, self.require_localized))
            .take(self.limit)
            .collect();

        tracing::debug!(
            query,
            candidates = total,
            kept = cities.len(),
            "Geocoding lookup finished"
        );
        Ok(cities)
    }
}
