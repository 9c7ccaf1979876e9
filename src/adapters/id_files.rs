use crate::core::prober::extract_listing_id;
use crate::domain::model::ListingId;
use crate::utils::error::{HarvestError, Result};
use serde_json::Value;
use std::path::Path;

fn json_ids(value: &Value) -> Vec<ListingId> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(object) => extract_listing_id(object),
                other => {
                    let mut wrapper = serde_json::Map::new();
                    wrapper.insert("id".to_string(), other.clone());
                    extract_listing_id(&wrapper)
                }
            })
            .collect(),
        // regions.json：區域名稱 → 識別碼陣列
        Value::Object(regions) => regions.values().flat_map(json_ids).collect(),
        _ => Vec::new(),
    }
}

/// 解析識別碼清單：JSON（陣列或區域對照表）或一行一個，`#` 開頭為註解
pub fn parse_id_list(content: &str) -> Result<Vec<ListingId>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        let value: Value = serde_json::from_str(content)?;
        return Ok(json_ids(&value));
    }

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            line.parse::<ListingId>()
                .ok()
                .filter(|id| *id != 0)
                .ok_or_else(|| HarvestError::Processing {
                    message: format!("Invalid listing id: {}", line),
                })
        })
        .collect()
}

pub fn read_id_file<P: AsRef<Path>>(path: P) -> Result<Vec<ListingId>> {
    let content = std::fs::read_to_string(path)?;
    parse_id_list(&content)
}

/// 從先前匯出的 CSV 讀取 `item_id` 欄
pub fn read_ids_from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<ListingId>> {
    let mut reader = csv::Reader::from_path(path)?;
    let column = reader
        .headers()?
        .iter()
        .position(|header| header == "item_id")
        .ok_or_else(|| HarvestError::Processing {
            message: "CSV file has no item_id column".to_string(),
        })?;

    let mut ids = Vec::new();
    for row in reader.records() {
        let row = row?;
        if let Some(id) = row
            .get(column)
            .and_then(|cell| cell.trim().parse::<ListingId>().ok())
            .filter(|id| *id != 0)
        {
            ids.push(id);
        }
    }
    Ok(ids)
}
