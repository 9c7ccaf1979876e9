use httpmock::prelude::*;
use listing_harvest::adapters::geocoder::StaticGeocoder;
use listing_harvest::domain::model::Coordinate;
use listing_harvest::domain::ports::TokioSleeper;
use listing_harvest::{app, EtlEngine, HarvestConfig, HarvestJob, HarvestPipeline, LocalStorage};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// 所有端點指向 mock server，等待時間全部歸零
fn config_for(server: &MockServer, output_path: &str, extra: &str) -> HarvestConfig {
    let toml_content = format!(
        r#"
[provider]
probe_endpoints = ["{probe}"]
detail_endpoint = "{detail}"
item_endpoint = "{item}"
probe_timeout_seconds = 2
detail_timeout_seconds = 2
item_timeout_seconds = 2

[grid]
radius_km = 1.0
steps = 1

[discovery]
point_pause_ms = 0

[fetch]
chunk_size = 10
base_delay_ms = 0
chunk_pause_ms = 0
item_pause_ms = 0

[geocoder]
order = ["provider_search"]
search_endpoint = "{search}"

[load]
output_path = "{output}"
{extra}
"#,
        probe = server.url("/v2/items/oneroom"),
        detail = server.url("/house/property/v1/items/list"),
        item = server.url("/v3/items/{item_id}"),
        search = server.url("/v3/search"),
        output = output_path,
        extra = extra,
    );
    HarvestConfig::from_toml_str(&toml_content).unwrap()
}

fn pipeline(config: &HarvestConfig, job: HarvestJob) -> HarvestPipeline<LocalStorage> {
    let harvester = app::build_harvester(config, Arc::new(TokioSleeper)).unwrap();
    let storage = LocalStorage::new(config.load.output_path.clone());
    HarvestPipeline::new(storage, harvester, job, config.load.clone())
}

fn output_file(dir: &Path, prefix: &str) -> std::path::PathBuf {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .find(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(prefix))
        })
        .unwrap_or_else(|| panic!("no output file starting with {}", prefix))
}

fn mock_search(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET).path("/v3/search");
        then.status(200).json_body(json!({
            "success": true,
            "items": [{"type": "address", "name": "망원동", "lat": 37.5563, "lng": 126.9019}]
        }));
    });
}

#[tokio::test]
async fn test_end_to_end_harvest_writes_outputs() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();
    let server = MockServer::start();
    mock_search(&server);

    server.mock(|when, then| {
        when.method(GET).path("/v2/items/oneroom").query_param_exists("lat");
        then.status(200).json_body(json!({"items": [{"item_id": 101}, {"item_id": 102}]}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/v2/items/oneroom").query_param_exists("x");
        then.status(200)
            .json_body(json!({"data": {"items": [{"id": "103", "lat": 37.557, "lng": 126.903}]}}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/v2/items/oneroom").query_param_exists("centerLat");
        then.status(500);
    });
    let bulk = server.mock(|when, then| {
        when.method(POST)
            .path("/house/property/v1/items/list")
            .json_body(json!({"itemIds": [101, 102, 103]}));
        then.status(200).json_body(json!({
            "items": [
                {"item_id": 101, "title": "망원역 도보 5분", "deposit": 1000, "rent": 65,
                 "location": {"lat": 37.556, "lng": 126.901}},
                {"item_id": 102, "title": "신축", "random_location": {"lat": 37.555, "lng": 126.900}},
                {"item_id": 103, "title": "좌표 없음"}
            ]
        }));
    });

    let config = config_for(&server, &output_path, "");
    let engine = EtlEngine::new(pipeline(&config, HarvestJob::Regions(vec!["망원동".to_string()])));

    let result = engine.run().await.unwrap();
    assert_eq!(result, output_path);
    bulk.assert();

    let csv_text = std::fs::read_to_string(output_file(temp_dir.path(), "listings_")).unwrap();
    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[0][1], "101");
    assert_eq!(&rows[0][15], "precise");
    assert_eq!(&rows[1][15], "approximate");
    // 詳情沒有座標時使用探測結果的座標
    assert_eq!(&rows[2][13], "37.557");
    assert_eq!(&rows[2][15], "approximate");

    let records: serde_json::Value =
        serde_json::from_slice(&std::fs::read(output_file(temp_dir.path(), "records_")).unwrap())
            .unwrap();
    assert_eq!(records.as_array().unwrap().len(), 3);

    let regions: serde_json::Value =
        serde_json::from_slice(&std::fs::read(temp_dir.path().join("regions.json")).unwrap())
            .unwrap();
    assert_eq!(regions, json!({"망원동": [101, 102, 103]}));
}

#[tokio::test]
async fn test_overlapping_regions_are_fetched_once() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();
    let server = MockServer::start();
    mock_search(&server);

    server.mock(|when, then| {
        when.method(GET).path("/v2/items/oneroom");
        then.status(200).json_body(json!({"items": [{"item_id": 7}, {"item_id": 8}]}));
    });
    let bulk = server.mock(|when, then| {
        when.method(POST).path("/house/property/v1/items/list");
        then.status(200).json_body(json!({"items": [{"item_id": 7}, {"item_id": 8}]}));
    });

    let config = config_for(&server, &output_path, "");
    let regions = vec!["망원동".to_string(), "망원1동".to_string()];
    let engine = EtlEngine::new(pipeline(&config, HarvestJob::Regions(regions)));

    engine.run().await.unwrap();
    bulk.assert_hits(1);

    let regions: serde_json::Value =
        serde_json::from_slice(&std::fs::read(temp_dir.path().join("regions.json")).unwrap())
            .unwrap();
    assert_eq!(regions, json!({"망원동": [7, 8], "망원1동": [7, 8]}));
}

#[tokio::test]
async fn test_failed_chunk_is_retried_then_dropped() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();
    let server = MockServer::start();
    mock_search(&server);

    server.mock(|when, then| {
        when.method(GET).path("/v2/items/oneroom");
        then.status(200).json_body(json!({"items": [{"item_id": 1}]}));
    });
    let bulk = server.mock(|when, then| {
        when.method(POST).path("/house/property/v1/items/list");
        then.status(503);
    });

    let config = config_for(&server, &output_path, "");
    let engine = EtlEngine::new(pipeline(&config, HarvestJob::Regions(vec!["망원동".to_string()])));

    // 單一 chunk 失敗不會讓整次執行失敗
    engine.run().await.unwrap();
    bulk.assert_hits(3);

    let csv_text = std::fs::read_to_string(output_file(temp_dir.path(), "listings_")).unwrap();
    assert_eq!(csv_text.lines().count(), 1);
}

#[tokio::test]
async fn test_unknown_region_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/v2/items/oneroom");
        then.status(200).json_body(json!({"items": [{"item_id": 55}]}));
    });
    server.mock(|when, then| {
        when.method(POST).path("/house/property/v1/items/list");
        then.status(200).json_body(json!({"items": [{"item_id": 55, "title": "합정"}]}));
    });

    let config = config_for(&server, &output_path, "");
    let geocoder = StaticGeocoder::new().with_region("합정동", Coordinate::new(37.549, 126.913));
    let harvester = app::build_harvester_with(
        &config,
        reqwest::Client::new(),
        Arc::new(geocoder),
        Arc::new(TokioSleeper),
    );
    let regions = vec!["없는동".to_string(), "합정동".to_string()];
    let pipeline = HarvestPipeline::new(
        LocalStorage::new(output_path.clone()),
        harvester,
        HarvestJob::Regions(regions),
        config.load.clone(),
    );

    EtlEngine::new(pipeline).run().await.unwrap();

    let regions: serde_json::Value =
        serde_json::from_slice(&std::fs::read(temp_dir.path().join("regions.json")).unwrap())
            .unwrap();
    assert_eq!(regions, json!({"합정동": [55]}));
}

#[tokio::test]
async fn test_details_individually_into_zip() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();
    let server = MockServer::start();

    for (id, title) in [(46979267u64, "역세권"), (46893661u64, "신축")] {
        server.mock(move |when, then| {
            when.method(GET)
                .path(format!("/v3/items/{}", id))
                .query_param("domain", "zigbang");
            then.status(200).json_body(json!({
                "item": {"itemId": id, "title": title, "price": {"deposit": 500, "rent": 45}}
            }));
        });
    }

    let config = config_for(
        &server,
        &output_path,
        "compression = { enabled = true, filename = \"details.zip\" }",
    );
    let job = HarvestJob::Details {
        ids: vec![46979267, 46893661, 46979267],
        individually: true,
    };
    let engine = EtlEngine::new(pipeline(&config, job));

    let result = engine.run().await.unwrap();
    assert!(result.ends_with("details.zip"));

    let zip_data = std::fs::read(temp_dir.path().join("details.zip")).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
    let csv_name = archive
        .file_names()
        .find(|name| name.starts_with("listings_"))
        .unwrap()
        .to_string();

    let mut csv_text = String::new();
    std::io::Read::read_to_string(&mut archive.by_name(&csv_name).unwrap(), &mut csv_text).unwrap();
    let lines: Vec<&str> = csv_text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("details,46979267,역세권"));
    assert!(lines[2].contains(",500,45,"));
}
