use crate::domain::model::{Coordinate, ListingId, ListingRecord, LocationPrecision};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// 匯出用的扁平列。缺少的數值欄位保持 `None`，不補 0
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedListing {
    pub region: String,
    pub item_id: Option<ListingId>,
    pub title: Option<String>,
    pub address: Option<String>,
    pub local1: String,
    pub local2: String,
    pub local3: String,
    pub deposit: Option<f64>,
    pub rent: Option<f64>,
    pub size_m2: Option<f64>,
    pub floor: Option<String>,
    pub service_type: Option<String>,
    pub manage_cost: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub location_precision: Option<LocationPrecision>,
    pub thumbnail: Option<String>,
}

pub const CSV_HEADER: [&str; 17] = [
    "region",
    "item_id",
    "title",
    "address",
    "local1",
    "local2",
    "local3",
    "deposit",
    "rent",
    "size_m2",
    "floor",
    "service_type",
    "manage_cost",
    "lat",
    "lng",
    "location_precision",
    "thumbnail",
];

/// 座標欄位依序嘗試：`location`（精確）、`random_location`/`randomLocation`（偏移）、頂層 `lat`/`lng`
const LOCATION_SOURCES: [(Option<&str>, LocationPrecision); 4] = [
    (Some("location"), LocationPrecision::Precise),
    (Some("random_location"), LocationPrecision::Approximate),
    (Some("randomLocation"), LocationPrecision::Approximate),
    (None, LocationPrecision::Approximate),
];

/// 面積欄位：`size_m2`，其次是專用面積、供給面積
const AREA_FIELDS: [&str; 2] = ["전용면적", "공급면적"];

/// 單筆詳情的 `area` 物件裡對應的鍵
const SINGLE_ITEM_AREA_FIELDS: [&str; 2] = ["전용면적M2", "공급면적M2"];

fn first<'a>(data: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| data.get(*key))
        .find(|value| is_present(value))
}

/// 對應原始資料裡「有值」的判斷：null、空字串都跳過
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.is_empty(),
        _ => true,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        other => Some(other.to_string()),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// 單筆詳情把部分欄位包成物件，例如 `{"floor": "3", "allFloors": "5"}`；取出其中的 `key`
fn unwrap_field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(fields) => fields.get(key).filter(|inner| is_present(inner)),
        other => Some(other),
    }
}

fn nested_text(data: &Map<String, Value>, parent: &str, key: &str) -> String {
    data.get(parent)
        .and_then(|value| value.get(key))
        .and_then(as_text)
        .unwrap_or_default()
}

fn coordinate_in(data: &Map<String, Value>) -> Option<Coordinate> {
    let lat = data.get("lat").and_then(as_number)?;
    let lng = data.get("lng").and_then(as_number)?;
    Some(Coordinate::new(lat, lng))
}

/// 取出第一個同時有 lat 與 lng 的來源；不會混用兩個來源的經緯度
pub fn locate(data: &Map<String, Value>) -> Option<(Coordinate, LocationPrecision)> {
    LOCATION_SOURCES.iter().find_map(|(field, precision)| {
        let coordinate = match field {
            Some(field) => data
                .get(*field)
                .and_then(Value::as_object)
                .and_then(coordinate_in),
            None => coordinate_in(data),
        }?;
        Some((coordinate, *precision))
    })
}

fn size_m2(data: &Map<String, Value>) -> Option<f64> {
    data.get("size_m2")
        .and_then(as_number)
        .filter(|size| *size != 0.0)
        .or_else(|| {
            AREA_FIELDS
                .iter()
                .filter_map(|field| data.get(*field).and_then(|area| area.get("m2")).and_then(as_number))
                .find(|size| *size != 0.0)
        })
        .or_else(|| {
            let area = data.get("area")?;
            SINGLE_ITEM_AREA_FIELDS
                .iter()
                .filter_map(|field| area.get(*field).and_then(as_number))
                .find(|size| *size != 0.0)
        })
}

impl ParsedListing {
    /// 批次端點回傳的記錄直接解析；單筆端點的 `{"item": {...}}` 會先解開
    pub fn from_record(record: &ListingRecord, region: &str) -> Self {
        let data = match record.data.get("item").and_then(Value::as_object) {
            Some(item) => item,
            None => &record.data,
        };

        let address = first(data, &["address"])
            .and_then(as_text)
            .or_else(|| {
                data.get("addressOrigin")
                    .and_then(|origin| origin.get("fullText"))
                    .and_then(as_text)
            });

        let deposit = first(data, &["deposit"])
            .or_else(|| data.get("price").and_then(|price| price.get("deposit")))
            .and_then(as_number);
        let rent = first(data, &["rent"])
            .or_else(|| data.get("price").and_then(|price| price.get("rent")))
            .and_then(as_number);

        let location = locate(data);

        Self {
            region: region.to_string(),
            item_id: crate::core::prober::extract_listing_id(data),
            title: first(data, &["title"]).and_then(as_text),
            address,
            local1: nested_text(data, "addressOrigin", "local1"),
            local2: nested_text(data, "addressOrigin", "local2"),
            local3: nested_text(data, "addressOrigin", "local3"),
            deposit,
            rent,
            size_m2: size_m2(data),
            floor: first(data, &["floor"])
                .and_then(|floor| unwrap_field(floor, "floor"))
                .and_then(as_text),
            service_type: first(data, &["service_type", "serviceType", "service"]).and_then(as_text),
            manage_cost: first(data, &["manage_cost", "manageCost"])
                .and_then(|cost| unwrap_field(cost, "amount"))
                .and_then(as_text),
            lat: location.map(|(coordinate, _)| coordinate.lat),
            lng: location.map(|(coordinate, _)| coordinate.lng),
            location_precision: location.map(|(_, precision)| precision),
            thumbnail: first(data, &["images_thumbnail", "imageThumbnail"]).and_then(as_text),
        }
    }

    /// 沒有座標的列用探測時的標記座標補上
    pub fn fill_missing_location(&mut self, probe_coordinates: &HashMap<ListingId, Coordinate>) {
        if self.lat.is_some() && self.lng.is_some() {
            return;
        }
        if let Some(coordinate) = self.item_id.and_then(|id| probe_coordinates.get(&id)) {
            self.lat = Some(coordinate.lat);
            self.lng = Some(coordinate.lng);
            self.location_precision = Some(LocationPrecision::Approximate);
        }
    }

    pub fn csv_row(&self) -> Vec<String> {
        fn cell<T: ToString>(value: &Option<T>) -> String {
            value.as_ref().map(ToString::to_string).unwrap_or_default()
        }

        vec![
            self.region.clone(),
            cell(&self.item_id),
            cell(&self.title),
            cell(&self.address),
            self.local1.clone(),
            self.local2.clone(),
            self.local3.clone(),
            cell(&self.deposit),
            cell(&self.rent),
            cell(&self.size_m2),
            cell(&self.floor),
            cell(&self.service_type),
            cell(&self.manage_cost),
            cell(&self.lat),
            cell(&self.lng),
            match self.location_precision {
                Some(LocationPrecision::Precise) => "precise".to_string(),
                Some(LocationPrecision::Approximate) => "approximate".to_string(),
                None => String::new(),
            },
            cell(&self.thumbnail),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> ListingRecord {
        ListingRecord::new(value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_bulk_record_fields() {
        let parsed = ParsedListing::from_record(
            &record(json!({
                "item_id": 46893661,
                "title": "망원역 도보 5분",
                "addressOrigin": {"local1": "서울시", "local2": "마포구", "local3": "망원동", "fullText": "서울시 마포구 망원동"},
                "deposit": 1000,
                "rent": 65,
                "전용면적": {"m2": 23.14},
                "floor": "3",
                "serviceType": "원룸",
                "manageCost": "7",
                "location": {"lat": 37.556, "lng": 126.901},
                "random_location": {"lat": 37.557, "lng": 126.902},
                "images_thumbnail": "https://img.test/1.jpg"
            })),
            "망원동",
        );

        assert_eq!(parsed.item_id, Some(46893661));
        assert_eq!(parsed.address.as_deref(), Some("서울시 마포구 망원동"));
        assert_eq!(parsed.local2, "마포구");
        assert_eq!(parsed.deposit, Some(1000.0));
        assert_eq!(parsed.size_m2, Some(23.14));
        assert_eq!(parsed.service_type.as_deref(), Some("원룸"));
        assert_eq!(parsed.lat, Some(37.556));
        assert_eq!(parsed.location_precision, Some(LocationPrecision::Precise));
    }

    #[test]
    fn test_missing_numbers_stay_absent() {
        let parsed = ParsedListing::from_record(&record(json!({"itemId": 5})), "r");
        assert_eq!(parsed.deposit, None);
        assert_eq!(parsed.rent, None);
        assert_eq!(parsed.size_m2, None);
        assert_eq!(parsed.location_precision, None);
        assert_eq!(parsed.csv_row()[7], "");
    }

    #[test]
    fn test_random_location_is_approximate() {
        let parsed = ParsedListing::from_record(
            &record(json!({"id": 6, "location": {"lat": null}, "random_location": {"lat": 37.1, "lng": 127.1}})),
            "r",
        );
        assert_eq!(parsed.lat, Some(37.1));
        assert_eq!(parsed.location_precision, Some(LocationPrecision::Approximate));

        let parsed = ParsedListing::from_record(&record(json!({"id": 7, "lat": 37.2, "lng": 127.2})), "r");
        assert_eq!(parsed.lng, Some(127.2));
        assert_eq!(parsed.location_precision, Some(LocationPrecision::Approximate));
    }

    #[test]
    fn test_single_item_document_is_unwrapped() {
        let parsed = ParsedListing::from_record(
            &record(json!({
                "item": {
                    "itemId": 46979267,
                    "title": "역세권",
                    "price": {"deposit": 500, "rent": 50},
                    "location": {"lat": 37.5, "lng": 127.0}
                },
                "agent": {"agentName": "x"}
            })),
            "details",
        );
        assert_eq!(parsed.item_id, Some(46979267));
        assert_eq!(parsed.rent, Some(50.0));
        assert_eq!(parsed.location_precision, Some(LocationPrecision::Precise));
    }

    #[test]
    fn test_single_item_nested_fields_are_flattened() {
        let parsed = ParsedListing::from_record(
            &record(json!({
                "item": {
                    "itemId": 46893661,
                    "floor": {"floor": "3", "allFloors": "5"},
                    "manageCost": {"amount": 7, "includes": ["수도"]},
                    "area": {"전용면적M2": 23.1},
                    "randomLocation": {"lat": 37.5, "lng": 127.0}
                }
            })),
            "details",
        );
        assert_eq!(parsed.floor.as_deref(), Some("3"));
        assert_eq!(parsed.manage_cost.as_deref(), Some("7"));
        assert_eq!(parsed.size_m2, Some(23.1));
        assert_eq!(parsed.lat, Some(37.5));
        assert_eq!(parsed.lng, Some(127.0));
        assert_eq!(parsed.location_precision, Some(LocationPrecision::Approximate));

        // 沒有樓層值的物件不會變成 JSON 字串
        let parsed = ParsedListing::from_record(
            &record(json!({"item": {"itemId": 1, "floor": {"allFloors": "5"}}})),
            "details",
        );
        assert_eq!(parsed.floor, None);
    }

    #[test]
    fn test_fill_missing_location_from_probe() {
        let mut parsed = ParsedListing::from_record(&record(json!({"item_id": 8})), "r");
        let coordinates = HashMap::from([(8, Coordinate::new(37.3, 127.3))]);
        parsed.fill_missing_location(&coordinates);
        assert_eq!(parsed.lat, Some(37.3));
        assert_eq!(parsed.location_precision, Some(LocationPrecision::Approximate));

        let mut precise = ParsedListing::from_record(
            &record(json!({"item_id": 8, "location": {"lat": 1.0, "lng": 2.0}})),
            "r",
        );
        precise.fill_missing_location(&coordinates);
        assert_eq!(precise.lat, Some(1.0));
    }

    #[test]
    fn test_csv_row_matches_header() {
        let parsed = ParsedListing::from_record(&record(json!({"item_id": 9, "title": "t"})), "r");
        let row = parsed.csv_row();
        assert_eq!(row.len(), CSV_HEADER.len());
        assert_eq!(row[1], "9");
        assert_eq!(row[2], "t");
    }
}
