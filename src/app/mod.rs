// 由設定組裝出完整的元件，CLI 與整合測試共用
use crate::adapters::{geocoder, http};
use crate::config::HarvestConfig;
use crate::core::fetcher::{BatchDetailFetcher, HttpDetailSource};
use crate::core::harvest::Harvester;
use crate::core::prober::{build_templates, EndpointProber};
use crate::domain::ports::{Geocoder, Sleeper};
use crate::utils::error::Result;
use std::sync::Arc;

pub fn build_harvester(config: &HarvestConfig, sleeper: Arc<dyn Sleeper>) -> Result<Harvester> {
    let client = http::build_client(&config.provider.headers)?;
    let geocoder = geocoder::build_geocoder(&config.geocoder, &client);
    Ok(build_harvester_with(config, client, geocoder, sleeper))
}

/// 可替換地理編碼器的版本
pub fn build_harvester_with(
    config: &HarvestConfig,
    client: reqwest::Client,
    geocoder: Arc<dyn Geocoder>,
    sleeper: Arc<dyn Sleeper>,
) -> Harvester {
    let provider = &config.provider;

    let prober = EndpointProber::new(
        client.clone(),
        build_templates(&provider.probe_endpoints),
        provider.probe_timeout(),
    );

    let source = HttpDetailSource::new(
        client,
        provider.detail_endpoint.clone(),
        provider.item_endpoint.clone(),
    )
    .with_item_query(provider.item_query_pairs())
    .with_timeouts(provider.detail_timeout(), provider.item_timeout());

    let fetcher = BatchDetailFetcher::new(Arc::new(source), sleeper.clone())
        .with_policy(config.fetch.retry_policy())
        .with_chunk_size(config.fetch.chunk_size)
        .with_pauses(config.fetch.chunk_pause(), config.fetch.item_pause());

    Harvester::new(geocoder, prober, fetcher, sleeper)
        .with_grid(config.grid.radius_km, config.grid.steps)
        .with_point_pause(config.discovery.point_pause())
}
