use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 列表的唯一識別碼，去重的依據
pub type ListingId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// 一次搜尋的地理範圍；`name` 只用於日誌與輸出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub center: Coordinate,
    pub radius_km: f64,
    pub steps: usize,
}

/// Provider 回傳的單筆詳情，欄位不做解讀
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingRecord {
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl ListingRecord {
    pub fn new(data: serde_json::Map<String, serde_json::Value>) -> Self {
        Self { data }
    }

    /// 依 `item_id`, `id`, `itemId` 順序取出識別碼
    pub fn listing_id(&self) -> Option<ListingId> {
        crate::core::prober::extract_listing_id(&self.data)
    }
}

/// 座標來源的精確度；`random_location` 是 provider 為隱私而偏移過的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationPrecision {
    Precise,
    Approximate,
}

/// 探測時附帶的標記座標
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeHit {
    pub id: ListingId,
    pub coordinate: Option<Coordinate>,
}

/// 單一區域的收集結果
#[derive(Debug, Clone, Default)]
pub struct RegionHarvest {
    pub region_name: String,
    pub discovered_ids: Vec<ListingId>,
    pub fresh_ids: Vec<ListingId>,
    pub records: Vec<ListingRecord>,
    pub unrecovered_ids: Vec<ListingId>,
    pub probe_coordinates: HashMap<ListingId, Coordinate>,
    pub error: Option<String>,
}

impl RegionHarvest {
    pub fn failed(region_name: &str, error: String) -> Self {
        Self {
            region_name: region_name.to_string(),
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub rows: Vec<crate::core::extract::ParsedListing>,
    pub csv_output: String,
    pub raw_records: Vec<ListingRecord>,
    /// 依區域處理順序排列
    pub region_ids: Vec<(String, Vec<ListingId>)>,
}
