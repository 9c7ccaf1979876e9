use crate::core::grid::{self, BoundingBox};
use crate::domain::model::{Coordinate, ListingId, ProbeHit};
use reqwest::Client;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// 識別碼欄位名稱，依優先順序
pub const ID_FIELDS: [&str; 3] = ["item_id", "id", "itemId"];

const ZOOM_LEVEL: &str = "15";

const GEOHASH_PRECISION: usize = 4;

/// 同一個「中心 + 半徑」查詢的不同參數命名方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamShape {
    /// `lat`, `lng`, `radius`, `zoom_level`
    LatLng,
    /// `centerLat`, `centerLng`, `radius`, `zoom_level`
    CenterLatLng,
    /// `x` = 經度, `y` = 緯度, `radius`
    Xy,
    /// `latNorth`/`latSouth`/`lngEast`/`lngWest` 加上 `geohash`；回應只保留框內且有座標的結果
    BoundingBox,
}

impl ParamShape {
    pub const ALL: [ParamShape; 4] = [
        ParamShape::LatLng,
        ParamShape::CenterLatLng,
        ParamShape::Xy,
        ParamShape::BoundingBox,
    ];

    pub fn query(&self, point: Coordinate, radius_km: f64) -> Vec<(&'static str, String)> {
        match self {
            ParamShape::LatLng => vec![
                ("lat", point.lat.to_string()),
                ("lng", point.lng.to_string()),
                ("radius", radius_km.to_string()),
                ("zoom_level", ZOOM_LEVEL.to_string()),
            ],
            ParamShape::CenterLatLng => vec![
                ("centerLat", point.lat.to_string()),
                ("centerLng", point.lng.to_string()),
                ("radius", radius_km.to_string()),
                ("zoom_level", ZOOM_LEVEL.to_string()),
            ],
            ParamShape::Xy => vec![
                ("x", point.lng.to_string()),
                ("y", point.lat.to_string()),
                ("radius", radius_km.to_string()),
            ],
            ParamShape::BoundingBox => {
                let bounds = BoundingBox::around(point, radius_km);
                vec![
                    ("geohash", grid::geohash(point, GEOHASH_PRECISION)),
                    ("depositMin", "0".to_string()),
                    ("rentMin", "0".to_string()),
                    ("salesTypes[0]", "전세".to_string()),
                    ("salesTypes[1]", "월세".to_string()),
                    ("latNorth", bounds.north.to_string()),
                    ("latSouth", bounds.south.to_string()),
                    ("lngEast", bounds.east.to_string()),
                    ("lngWest", bounds.west.to_string()),
                    ("domain", "zigbang".to_string()),
                    ("checkAnyItemWithoutFilter", "true".to_string()),
                ]
            }
        }
    }

    /// 只有矩形查詢會回傳框外的結果，需要再篩一次
    fn keeps(&self, hit: &ProbeHit, point: Coordinate, radius_km: f64) -> bool {
        match self {
            ParamShape::BoundingBox => hit
                .coordinate
                .is_some_and(|coordinate| BoundingBox::around(point, radius_km).contains(coordinate)),
            _ => true,
        }
    }
}

/// 在回應中尋找結果清單的路徑，依 [`ListLocator::PRIORITY`] 順序嘗試
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListLocator {
    /// `{"items": [...]}`
    TopLevelItems,
    /// `{"data": {"items": [...]}}`
    DataItems,
    /// 物件中第一個值為陣列的欄位（文件順序）
    FirstListField,
    /// 回應本身就是陣列
    BareList,
}

impl ListLocator {
    pub const PRIORITY: [ListLocator; 4] = [
        ListLocator::TopLevelItems,
        ListLocator::DataItems,
        ListLocator::FirstListField,
        ListLocator::BareList,
    ];

    pub fn locate<'a>(&self, body: &'a Value) -> Option<&'a Vec<Value>> {
        match self {
            ListLocator::TopLevelItems => body.get("items")?.as_array(),
            ListLocator::DataItems => body.get("data")?.get("items")?.as_array(),
            ListLocator::FirstListField => body.as_object()?.values().find_map(Value::as_array),
            ListLocator::BareList => body.as_array(),
        }
    }
}

/// 第一個命中的 locator 與其清單
pub fn locate_items(body: &Value) -> Option<(ListLocator, &Vec<Value>)> {
    ListLocator::PRIORITY
        .iter()
        .find_map(|locator| locator.locate(body).map(|items| (*locator, items)))
}

/// 數字或數字字串轉成識別碼；0、負數、小數都不算
fn coerce_id(value: &Value) -> Option<ListingId> {
    let id = match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    (id != 0).then_some(id)
}

pub fn extract_listing_id(element: &Map<String, Value>) -> Option<ListingId> {
    ID_FIELDS
        .iter()
        .find_map(|field| element.get(*field).and_then(coerce_id))
}

fn extract_hit(element: &Value) -> Option<ProbeHit> {
    let object = element.as_object()?;
    let id = extract_listing_id(object)?;
    let coordinate = match (
        object.get("lat").and_then(Value::as_f64),
        object.get("lng").and_then(Value::as_f64),
    ) {
        (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)),
        _ => None,
    };
    Some(ProbeHit { id, coordinate })
}

/// 端點 URL + 參數形狀
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTemplate {
    pub endpoint: String,
    pub shape: ParamShape,
}

/// 端點 × 參數形狀的笛卡兒積，端點在外層
pub fn build_templates(endpoints: &[String]) -> Vec<ProbeTemplate> {
    endpoints
        .iter()
        .flat_map(|endpoint| {
            ParamShape::ALL.iter().map(move |shape| ProbeTemplate {
                endpoint: endpoint.clone(),
                shape: *shape,
            })
        })
        .collect()
}

pub struct EndpointProber {
    client: Client,
    templates: Vec<ProbeTemplate>,
    timeout: Duration,
}

impl EndpointProber {
    pub fn new(client: Client, templates: Vec<ProbeTemplate>, timeout: Duration) -> Self {
        Self {
            client,
            templates,
            timeout,
        }
    }

    /// 所有組合結果的聯集，排序且不重複。任何失敗都只是跳過該組合
    pub async fn probe(&self, point: Coordinate, radius_km: f64) -> Vec<ListingId> {
        self.probe_hits(point, radius_km)
            .await
            .into_iter()
            .map(|hit| hit.id)
            .collect()
    }

    /// 同 [`probe`](Self::probe)，另外保留每個識別碼第一次出現時附帶的座標
    pub async fn probe_hits(&self, point: Coordinate, radius_km: f64) -> Vec<ProbeHit> {
        let mut found: BTreeMap<ListingId, Option<Coordinate>> = BTreeMap::new();

        for template in &self.templates {
            let Some(hits) = self.query_template(template, point, radius_km).await else {
                continue;
            };
            for hit in hits {
                let entry = found.entry(hit.id).or_insert(None);
                if entry.is_none() {
                    *entry = hit.coordinate;
                }
            }
        }

        found
            .into_iter()
            .map(|(id, coordinate)| ProbeHit { id, coordinate })
            .collect()
    }

    async fn query_template(
        &self,
        template: &ProbeTemplate,
        point: Coordinate,
        radius_km: f64,
    ) -> Option<Vec<ProbeHit>> {
        let response = match self
            .client
            .get(&template.endpoint)
            .query(&template.shape.query(point, radius_km))
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("probe {} {:?}: request failed: {}", template.endpoint, template.shape, e);
                return None;
            }
        };

        if response.status().as_u16() != 200 {
            tracing::debug!(
                "probe {} {:?}: HTTP {}",
                template.endpoint,
                template.shape,
                response.status()
            );
            return None;
        }

        let bytes = response.bytes().await.ok()?;
        let body: Value = match serde_json::from_slice(&bytes) {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!("probe {} {:?}: invalid JSON: {}", template.endpoint, template.shape, e);
                return None;
            }
        };

        let (locator, items) = locate_items(&body)?;
        let hits: Vec<ProbeHit> = items
            .iter()
            .filter_map(extract_hit)
            .filter(|hit| template.shape.keeps(hit, point, radius_km))
            .collect();
        tracing::debug!(
            "probe {} {:?}: {} ids via {:?}",
            template.endpoint,
            template.shape,
            hits.len(),
            locator
        );
        Some(hits)
    }
}
