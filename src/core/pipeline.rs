use crate::config::LoadConfig;
use crate::core::extract::{ParsedListing, CSV_HEADER};
use crate::core::harvest::Harvester;
use crate::core::{Pipeline, RegionHarvest, Storage, TransformResult};
use crate::domain::model::ListingId;
use crate::utils::error::{HarvestError, Result};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const REGIONS_FILE: &str = "regions.json";

/// 要執行的工作：依區域搜尋，或直接以識別碼取得詳情
#[derive(Debug, Clone, PartialEq)]
pub enum HarvestJob {
    Regions(Vec<String>),
    Details { ids: Vec<ListingId>, individually: bool },
}

pub struct HarvestPipeline<S: Storage> {
    storage: S,
    harvester: Harvester,
    job: HarvestJob,
    load: LoadConfig,
}

impl<S: Storage> HarvestPipeline<S> {
    pub fn new(storage: S, harvester: Harvester, job: HarvestJob, load: LoadConfig) -> Self {
        Self {
            storage,
            harvester,
            job,
            load,
        }
    }
}

/// 以 csv crate 產生完整的 CSV（含標頭）
pub fn render_csv(rows: &[ParsedListing]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for row in rows {
        writer.write_record(row.csv_row())?;
    }

    let bytes = writer.into_inner().map_err(|e| HarvestError::Processing {
        message: format!("Failed to flush CSV writer: {}", e),
    })?;
    String::from_utf8(bytes).map_err(|e| HarvestError::Processing {
        message: format!("CSV output is not valid UTF-8: {}", e),
    })
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for HarvestPipeline<S> {
    async fn extract(&self) -> Result<Vec<RegionHarvest>> {
        match &self.job {
            HarvestJob::Regions(regions) => Ok(self.harvester.run(regions).await),
            HarvestJob::Details { ids, individually } => {
                Ok(vec![self.harvester.fetch_details(ids, *individually).await])
            }
        }
    }

    async fn transform(&self, data: Vec<RegionHarvest>) -> Result<TransformResult> {
        let mut rows = Vec::new();
        let mut raw_records = Vec::new();
        let mut region_ids = Vec::new();

        for harvest in data {
            if let Some(error) = &harvest.error {
                tracing::debug!("Region {} left out of export: {}", harvest.region_name, error);
                continue;
            }

            for record in &harvest.records {
                let mut row = ParsedListing::from_record(record, &harvest.region_name);
                row.fill_missing_location(&harvest.probe_coordinates);
                rows.push(row);
            }
            region_ids.push((harvest.region_name, harvest.discovered_ids));
            raw_records.extend(harvest.records);
        }

        let csv_output = render_csv(&rows)?;

        Ok(TransformResult {
            rows,
            csv_output,
            raw_records,
            region_ids,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut outputs: Vec<(String, Vec<u8>)> = Vec::new();

        if self.load.wants("csv") {
            outputs.push((
                format!("listings_{}.csv", timestamp),
                result.csv_output.into_bytes(),
            ));
        }
        if self.load.wants("json") {
            outputs.push((
                format!("records_{}.json", timestamp),
                serde_json::to_vec_pretty(&result.raw_records)?,
            ));
        }

        let regions: serde_json::Map<String, serde_json::Value> = result
            .region_ids
            .into_iter()
            .map(|(name, ids)| (name, serde_json::json!(ids)))
            .collect();
        outputs.push((REGIONS_FILE.to_string(), serde_json::to_vec_pretty(&regions)?));

        if let Some(filename) = self.load.zip_filename() {
            let zip_data = {
                let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
                for (name, data) in &outputs {
                    zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
                    zip.write_all(data)?;
                }
                zip.finish()?.into_inner()
            };

            tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
            self.storage.write_file(filename, &zip_data).await?;
            return Ok(format!("{}/{}", self.load.output_path, filename));
        }

        for (name, data) in &outputs {
            tracing::debug!("Writing {} ({} bytes) to storage", name, data.len());
            self.storage.write_file(name, data).await?;
        }
        Ok(self.load.output_path.clone())
    }
}
