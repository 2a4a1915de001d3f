use crate::domain::model::Coordinates;
use crate::domain::ports::LocationProvider;
use crate::utils::error::{FinderError, Result};
use crate::utils::validation::{validate_coordinates, validate_url};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

pub const DEFAULT_IP_LOOKUP_ENDPOINT: &str = "http://ip-api.com/json";

/// 由命令列直接指定的座標
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinates);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<Coordinates> {
        validate_coordinates(self.0.latitude, self.0.longitude)?;
        Ok(self.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn current_position(&self) -> Result<Coordinates> {
        Err(FinderError::validation("Location lookup is disabled"))
    }
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    #[serde(alias = "latitude")]
    lat: Option<f64>,
    #[serde(alias = "longitude")]
    lon: Option<f64>,
}

/// 以 IP 反查大概位置，只查一次
#[derive(Debug, Clone)]
pub struct IpGeolocator {
    client: Client,
    endpoint: String,
}

impl IpGeolocator {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        validate_url("location.endpoint", &endpoint)?;
        Ok(Self {
            client: Client::new(),
            endpoint,
        })
    }
}

#[async_trait]
impl LocationProvider for IpGeolocator {
    async fn current_position(&self) -> Result<Coordinates> {
        tracing::debug!("Looking up location via: {}", self.endpoint);
        let response = self.client.get(&self.endpoint).send().await?;
        if !response.status().is_success() {
            return Err(FinderError::Transport {
                message: format!("Location lookup failed with status {}", response.status()),
                status: Some(response.status().as_u16()),
            });
        }

        let body: IpLookupResponse = response.json().await?;
        match (body.lat, body.lon) {
            (Some(latitude), Some(longitude)) => {
                validate_coordinates(latitude, longitude)?;
                Ok(Coordinates::new(latitude, longitude))
            }
            _ => Err(FinderError::transport(
                "Location lookup returned no coordinates",
            )),
        }
    }
}

/// 啟動時讀一次位置；失敗只記錄警告，不重試
pub async fn resolve_session_location<P: LocationProvider + ?Sized>(
    provider: &P,
) -> Option<Coordinates> {
    match provider.current_position().await {
        Ok(coords) => {
            tracing::info!("📍 Current location resolved: {}", coords);
            Some(coords)
        }
        Err(e) => {
            tracing::warn!("Geolocation permission denied or unavailable: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_location_resolves() {
        let coords = Coordinates::new(40.7, -74.0);
        assert_eq!(
            resolve_session_location(&FixedLocation(coords)).await,
            Some(coords)
        );
    }

    #[tokio::test]
    async fn test_out_of_range_fixed_location_is_unavailable() {
        let provider = FixedLocation(Coordinates::new(120.0, 0.0));
        assert_eq!(resolve_session_location(&provider).await, None);
    }

    #[test]
    fn test_no_location_degrades_to_none() {
        let resolved = tokio_test::block_on(resolve_session_location(&NoLocation));
        assert_eq!(resolved, None);
    }

    #[test]
    fn test_ip_geolocator_rejects_bad_endpoint() {
        assert!(IpGeolocator::new("not a url").is_err());
    }
}
