use anyhow::Context;
use clap::Parser;
use listing_harvest::domain::ports::TokioSleeper;
use listing_harvest::utils::logger;
use listing_harvest::{app, CliConfig, EtlEngine, HarvestPipeline, LocalStorage};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting listing-harvest");
    tracing::debug!("CLI args: {:?}", cli);

    let config = cli.load_config().context("invalid configuration")?;
    let job = cli.job().context("could not collect listing ids")?;

    let harvester = app::build_harvester(&config, Arc::new(TokioSleeper))?;
    let storage = LocalStorage::new(config.load.output_path.clone());
    let pipeline = HarvestPipeline::new(storage, harvester, job, config.load.clone());

    let engine = EtlEngine::new(pipeline);
    let output_path = engine.run().await.context("harvest failed")?;

    println!("✅ Harvest completed");
    println!("📁 Output saved to: {}", output_path);

    Ok(())
}
