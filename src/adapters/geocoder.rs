use crate::config::{GeocoderConfig, GeocoderKind};
use crate::domain::model::Coordinate;
use crate::domain::ports::Geocoder;
use crate::utils::error::{HarvestError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// 數字或數字字串都接受（Nominatim 回傳字串）
fn coordinate_part(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

async fn get_json(
    client: &Client,
    region: &str,
    endpoint: &str,
    query: &[(&str, &str)],
    timeout: Duration,
) -> Result<Value> {
    let response = client
        .get(endpoint)
        .query(query)
        .timeout(timeout)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(HarvestError::geocode(
            region,
            format!("HTTP {} from {}", response.status(), endpoint),
        ));
    }
    Ok(response.json().await?)
}

/// Provider 的地區搜尋；優先取 `type == "address"` 的項目
pub struct ProviderSearchGeocoder {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl ProviderSearchGeocoder {
    pub fn new(client: Client, endpoint: String, timeout: Duration) -> Self {
        Self {
            client,
            endpoint,
            timeout,
        }
    }
}

#[async_trait]
impl Geocoder for ProviderSearchGeocoder {
    async fn geocode(&self, region: &str) -> Result<Coordinate> {
        let body = get_json(
            &self.client,
            region,
            &self.endpoint,
            &[("q", region), ("type", "dong")],
            self.timeout,
        )
        .await?;

        let succeeded = body.get("success").and_then(Value::as_bool).unwrap_or(false);
        let items = body
            .get("items")
            .and_then(Value::as_array)
            .filter(|items| succeeded && !items.is_empty())
            .ok_or_else(|| HarvestError::geocode(region, "no search results"))?;

        let item = items
            .iter()
            .find(|item| item.get("type").and_then(Value::as_str) == Some("address"))
            .unwrap_or(&items[0]);

        match (coordinate_part(item.get("lat")), coordinate_part(item.get("lng"))) {
            (Some(lat), Some(lng)) => Ok(Coordinate::new(lat, lng)),
            _ => Err(HarvestError::geocode(region, "search result has no coordinates")),
        }
    }

    fn name(&self) -> &str {
        "provider_search"
    }
}

pub struct NominatimGeocoder {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl NominatimGeocoder {
    pub fn new(client: Client, endpoint: String, timeout: Duration) -> Self {
        Self {
            client,
            endpoint,
            timeout,
        }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, region: &str) -> Result<Coordinate> {
        let body = get_json(
            &self.client,
            region,
            &self.endpoint,
            &[("q", region), ("format", "json"), ("limit", "1")],
            self.timeout,
        )
        .await?;

        let first = body
            .as_array()
            .and_then(|places| places.first())
            .ok_or_else(|| HarvestError::geocode(region, "no geocoding results"))?;

        match (coordinate_part(first.get("lat")), coordinate_part(first.get("lon"))) {
            (Some(lat), Some(lng)) => Ok(Coordinate::new(lat, lng)),
            _ => Err(HarvestError::geocode(region, "result has no usable lat/lon")),
        }
    }

    fn name(&self) -> &str {
        "nominatim"
    }
}

/// 依序嘗試，回傳第一個成功的座標；全部失敗時回傳最後一個錯誤
pub struct FallbackGeocoder {
    geocoders: Vec<Arc<dyn Geocoder>>,
}

impl FallbackGeocoder {
    pub fn new(geocoders: Vec<Arc<dyn Geocoder>>) -> Self {
        Self { geocoders }
    }
}

#[async_trait]
impl Geocoder for FallbackGeocoder {
    async fn geocode(&self, region: &str) -> Result<Coordinate> {
        let mut last_error = HarvestError::geocode(region, "no geocoder configured");

        for geocoder in &self.geocoders {
            match geocoder.geocode(region).await {
                Ok(coordinate) => return Ok(coordinate),
                Err(e) => {
                    tracing::debug!("geocoder {} failed for {}: {}", geocoder.name(), region, e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    fn name(&self) -> &str {
        "fallback"
    }
}

/// 固定的區域對照表，不需要網路
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    regions: HashMap<String, Coordinate>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, name: &str, center: Coordinate) -> Self {
        self.regions.insert(name.to_string(), center);
        self
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, region: &str) -> Result<Coordinate> {
        self.regions
            .get(region)
            .copied()
            .ok_or_else(|| HarvestError::geocode(region, "unknown region"))
    }

    fn name(&self) -> &str {
        "static"
    }
}

pub fn build_geocoder(config: &GeocoderConfig, client: &Client) -> Arc<dyn Geocoder> {
    let timeout = Duration::from_secs(config.timeout_seconds);
    let geocoders = config
        .order
        .iter()
        .map(|kind| -> Arc<dyn Geocoder> {
            match kind {
                GeocoderKind::ProviderSearch => Arc::new(ProviderSearchGeocoder::new(
                    client.clone(),
                    config.search_endpoint.clone(),
                    timeout,
                )),
                GeocoderKind::Nominatim => Arc::new(NominatimGeocoder::new(
                    client.clone(),
                    config.nominatim_endpoint.clone(),
                    timeout,
                )),
            }
        })
        .collect();

    Arc::new(FallbackGeocoder::new(geocoders))
}
