#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::fetcher::{
    DEFAULT_BULK_TIMEOUT, DEFAULT_CHUNK_PAUSE, DEFAULT_CHUNK_SIZE, DEFAULT_ITEM_PAUSE,
    DEFAULT_ITEM_TIMEOUT,
};
use crate::core::harvest::{DEFAULT_POINT_PAUSE, DEFAULT_RADIUS_KM, DEFAULT_STEPS};
use crate::core::prober::DEFAULT_PROBE_TIMEOUT;
use crate::core::retry::{RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// 完整設定；每個區段都有預設值，空檔案也是合法設定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub provider: ProviderConfig,
    pub grid: GridConfig,
    pub discovery: DiscoveryConfig,
    pub fetch: FetchConfig,
    pub geocoder: GeocoderConfig,
    pub load: LoadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// 空間搜尋端點，依序與每種參數形狀組合
    pub probe_endpoints: Vec<String>,
    /// 批次詳情端點（POST）
    pub detail_endpoint: String,
    /// 單筆詳情端點，`{item_id}` 會被替換
    pub item_endpoint: String,
    pub item_query: BTreeMap<String, String>,
    pub probe_timeout_seconds: u64,
    pub detail_timeout_seconds: u64,
    pub item_timeout_seconds: u64,
    /// 額外的請求標頭，會覆蓋預設值
    pub headers: BTreeMap<String, String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            probe_endpoints: vec![
                "https://apis.zigbang.com/v2/items/oneroom".to_string(),
                "https://apis.zigbang.com/v2/items/oneroom/vip".to_string(),
            ],
            detail_endpoint: "https://apis.zigbang.com/house/property/v1/items/list".to_string(),
            item_endpoint: "https://apis.zigbang.com/v3/items/{item_id}".to_string(),
            item_query: BTreeMap::from([
                ("version".to_string(), String::new()),
                ("domain".to_string(), "zigbang".to_string()),
            ]),
            probe_timeout_seconds: DEFAULT_PROBE_TIMEOUT.as_secs(),
            detail_timeout_seconds: DEFAULT_BULK_TIMEOUT.as_secs(),
            item_timeout_seconds: DEFAULT_ITEM_TIMEOUT.as_secs(),
            headers: BTreeMap::new(),
        }
    }
}

impl ProviderConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }

    pub fn detail_timeout(&self) -> Duration {
        Duration::from_secs(self.detail_timeout_seconds)
    }

    pub fn item_timeout(&self) -> Duration {
        Duration::from_secs(self.item_timeout_seconds)
    }

    pub fn item_query_pairs(&self) -> Vec<(String, String)> {
        self.item_query
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub radius_km: f64,
    /// 每個軸的點數
    pub steps: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            radius_km: DEFAULT_RADIUS_KM,
            steps: DEFAULT_STEPS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub point_pause_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            point_pause_ms: DEFAULT_POINT_PAUSE.as_millis() as u64,
        }
    }
}

impl DiscoveryConfig {
    pub fn point_pause(&self) -> Duration {
        Duration::from_millis(self.point_pause_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub chunk_size: usize,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub chunk_pause_ms: u64,
    pub item_pause_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY.as_millis() as u64,
            chunk_pause_ms: DEFAULT_CHUNK_PAUSE.as_millis() as u64,
            item_pause_ms: DEFAULT_ITEM_PAUSE.as_millis() as u64,
        }
    }
}

impl FetchConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }

    pub fn chunk_pause(&self) -> Duration {
        Duration::from_millis(self.chunk_pause_ms)
    }

    pub fn item_pause(&self) -> Duration {
        Duration::from_millis(self.item_pause_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeocoderKind {
    /// Provider 自己的地區搜尋
    ProviderSearch,
    /// OpenStreetMap Nominatim
    Nominatim,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    /// 依序嘗試，第一個成功的為準
    pub order: Vec<GeocoderKind>,
    pub search_endpoint: String,
    pub nominatim_endpoint: String,
    pub timeout_seconds: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            order: vec![GeocoderKind::ProviderSearch, GeocoderKind::Nominatim],
            search_endpoint: "https://apis.zigbang.com/v3/search".to_string(),
            nominatim_endpoint: "https://nominatim.openstreetmap.org/search".to_string(),
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
    pub compression: Option<CompressionConfig>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
            output_formats: vec!["csv".to_string(), "json".to_string()],
            compression: None,
        }
    }
}

impl LoadConfig {
    pub fn wants(&self, format: &str) -> bool {
        self.output_formats.iter().any(|f| f.eq_ignore_ascii_case(format))
    }

    pub fn zip_filename(&self) -> Option<&str> {
        self.compression
            .as_ref()
            .filter(|compression| compression.enabled)
            .map(|compression| compression.filename.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: String,
}
