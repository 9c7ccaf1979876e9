use crate::adapters::id_files;
use crate::config::HarvestConfig;
use crate::core::pipeline::HarvestJob;
use crate::domain::model::ListingId;
use crate::utils::error::{HarvestError, Result};
use crate::utils::validation::Validate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "listing-harvest")]
#[command(about = "Harvest rental listings by sweeping a coordinate grid over named regions")]
pub struct CliConfig {
    #[arg(long, short, global = true, help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Output directory (overrides load.output_path)")]
    pub output: Option<String>,

    #[arg(long, global = true, help = "Grid half-width in km")]
    pub radius: Option<f64>,

    #[arg(long, global = true, help = "Grid points per axis")]
    pub steps: Option<usize>,

    #[arg(long, global = true, help = "Listing ids per bulk detail request")]
    pub chunk_size: Option<usize>,

    #[arg(long, short, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// 依區域名稱搜尋並取得所有列表詳情
    Harvest {
        #[arg(required = true)]
        regions: Vec<String>,
    },
    /// 直接以識別碼取得詳情
    Details {
        ids: Vec<ListingId>,

        #[arg(long, help = "File with ids: one per line, a JSON array or a regions.json map")]
        file: Option<PathBuf>,

        #[arg(long, help = "Previously exported CSV with an item_id column")]
        csv: Option<PathBuf>,

        #[arg(long, help = "Use the single-item endpoint for each id")]
        individual: bool,
    },
}

impl CliConfig {
    /// 載入設定檔（沒有指定時使用預設值），套用命令列覆寫後驗證
    pub fn load_config(&self) -> Result<HarvestConfig> {
        let mut config = match &self.config {
            Some(path) => HarvestConfig::from_file(path)?,
            None => HarvestConfig::default(),
        };
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut HarvestConfig) {
        if let Some(output) = &self.output {
            config.load.output_path = output.clone();
        }
        if let Some(radius) = self.radius {
            config.grid.radius_km = radius;
        }
        if let Some(steps) = self.steps {
            config.grid.steps = steps;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.fetch.chunk_size = chunk_size;
        }
    }

    pub fn job(&self) -> Result<HarvestJob> {
        match &self.command {
            Command::Harvest { regions } => Ok(HarvestJob::Regions(regions.clone())),
            Command::Details {
                ids,
                file,
                csv,
                individual,
            } => {
                let mut all_ids = ids.clone();
                if let Some(path) = file {
                    all_ids.extend(id_files::read_id_file(path)?);
                }
                if let Some(path) = csv {
                    all_ids.extend(id_files::read_ids_from_csv(path)?);
                }
                if all_ids.is_empty() {
                    return Err(HarvestError::MissingConfig {
                        field: "details ids (positional, --file or --csv)".to_string(),
                    });
                }
                Ok(HarvestJob::Details {
                    ids: all_ids,
                    individually: *individual,
                })
            }
        }
    }
}
