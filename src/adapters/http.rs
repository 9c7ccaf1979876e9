use crate::utils::error::{HarvestError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::collections::BTreeMap;

/// Provider 網頁前端送出的標頭；缺少時部分端點會拒絕請求
pub const DEFAULT_HEADERS: [(&str, &str); 6] = [
    ("accept", "application/json, text/plain, */*"),
    ("accept-language", "ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7"),
    ("origin", "https://www.zigbang.com"),
    ("referer", "https://www.zigbang.com/"),
    (
        "user-agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36",
    ),
    ("x-zigbang-platform", "www"),
];

fn header_error(name: &str, message: impl ToString) -> HarvestError {
    HarvestError::InvalidConfigValue {
        field: format!("provider.headers.{}", name),
        value: name.to_string(),
        reason: message.to_string(),
    }
}

/// 預設標頭加上設定檔的額外標頭（同名時以設定檔為準）
pub fn default_headers(extra: &BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    let pairs = DEFAULT_HEADERS
        .iter()
        .map(|(name, value)| (*name, *value))
        .chain(extra.iter().map(|(name, value)| (name.as_str(), value.as_str())));

    for (name, value) in pairs {
        let header_name = HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes())
            .map_err(|e| header_error(name, e))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| header_error(name, e))?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

pub fn build_client(extra_headers: &BTreeMap<String, String>) -> Result<Client> {
    let client = Client::builder()
        .default_headers(default_headers(extra_headers)?)
        .build()?;
    Ok(client)
}
