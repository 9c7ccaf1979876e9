use crate::core::aggregator::IdAggregator;
use crate::core::fetcher::BatchDetailFetcher;
use crate::core::prober::EndpointProber;
use crate::domain::model::{Coordinate, ListingId, Region, RegionHarvest};
use crate::domain::ports::{Geocoder, Sleeper};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_RADIUS_KM: f64 = 1.0;
pub const DEFAULT_STEPS: usize = 3;
pub const DEFAULT_POINT_PAUSE: Duration = Duration::from_millis(500);

/// 單次執行的狀態。跨區域的去重集合只活在這裡，不是全域變數
#[derive(Debug, Default)]
pub struct HarvestContext {
    seen: IdAggregator,
}

impl HarvestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 合併並回傳這次執行中第一次出現的識別碼
    pub fn claim(&mut self, ids: &[ListingId]) -> Vec<ListingId> {
        self.seen.merge(ids.iter().copied())
    }

    pub fn seen(&self) -> &IdAggregator {
        &self.seen
    }
}

/// 區域 → 網格 → 探測 → 去重 → 批次取得詳情
pub struct Harvester {
    geocoder: Arc<dyn Geocoder>,
    prober: EndpointProber,
    fetcher: BatchDetailFetcher,
    sleeper: Arc<dyn Sleeper>,
    radius_km: f64,
    steps: usize,
    point_pause: Duration,
}

impl Harvester {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        prober: EndpointProber,
        fetcher: BatchDetailFetcher,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            geocoder,
            prober,
            fetcher,
            sleeper,
            radius_km: DEFAULT_RADIUS_KM,
            steps: DEFAULT_STEPS,
            point_pause: DEFAULT_POINT_PAUSE,
        }
    }

    pub fn with_grid(mut self, radius_km: f64, steps: usize) -> Self {
        self.radius_km = radius_km;
        self.steps = steps;
        self
    }

    pub fn with_point_pause(mut self, point_pause: Duration) -> Self {
        self.point_pause = point_pause;
        self
    }

    /// 依序處理所有區域；單一區域失敗不會中斷後續區域
    pub async fn run(&self, region_names: &[String]) -> Vec<RegionHarvest> {
        let mut context = HarvestContext::new();
        let mut harvests = Vec::with_capacity(region_names.len());

        for (index, name) in region_names.iter().enumerate() {
            tracing::info!("🗺️ [{}/{}] {}", index + 1, region_names.len(), name);
            harvests.push(self.harvest_region(&mut context, name).await);
        }

        tracing::info!(
            "🏁 Harvest finished: {} regions, {} unique ids",
            harvests.len(),
            context.seen().len()
        );
        harvests
    }

    pub async fn harvest_region(&self, context: &mut HarvestContext, name: &str) -> RegionHarvest {
        let center = match self.geocoder.geocode(name).await {
            Ok(center) if center.is_finite() => center,
            Ok(center) => {
                tracing::warn!("⚠️ Skipping region {}: unusable center {:?}", name, center);
                return RegionHarvest::failed(name, format!("unusable center {:?}", center));
            }
            Err(e) => {
                tracing::warn!("⚠️ Skipping region {}: {}", name, e);
                return RegionHarvest::failed(name, e.to_string());
            }
        };
        tracing::info!("📍 {} → ({:.6}, {:.6}) via {}", name, center.lat, center.lng, self.geocoder.name());

        let region = Region {
            name: name.to_string(),
            center,
            radius_km: self.radius_km,
            steps: self.steps,
        };

        let (discovered_ids, probe_coordinates) = self.discover(&region).await;
        if discovered_ids.is_empty() {
            tracing::info!("  no listings found in {}", name);
            return RegionHarvest {
                region_name: name.to_string(),
                ..Default::default()
            };
        }

        let fresh_ids = context.claim(&discovered_ids);
        tracing::info!(
            "  {} ids discovered, {} not seen in earlier regions",
            discovered_ids.len(),
            fresh_ids.len()
        );

        let report = if fresh_ids.is_empty() {
            Default::default()
        } else {
            self.fetcher.fetch(&fresh_ids).await
        };

        RegionHarvest {
            region_name: name.to_string(),
            discovered_ids,
            fresh_ids,
            unrecovered_ids: report.unrecovered.clone(),
            records: report.into_records(),
            probe_coordinates,
            error: None,
        }
    }

    /// 逐點探測並合併成區域內不重複的識別碼（排序）
    pub async fn discover(&self, region: &Region) -> (Vec<ListingId>, HashMap<ListingId, Coordinate>) {
        let points = region.probe_points();
        let mut region_ids = IdAggregator::new();
        let mut coordinates = HashMap::new();

        for (index, point) in points.iter().enumerate() {
            let hits = self.prober.probe_hits(*point, region.radius_km).await;
            let fresh = region_ids.merge(hits.iter().map(|hit| hit.id));
            for hit in &hits {
                if let Some(coordinate) = hit.coordinate {
                    coordinates.entry(hit.id).or_insert(coordinate);
                }
            }
            tracing::debug!(
                "  point {}/{} ({:.5}, {:.5}): {} ids, {} new",
                index + 1,
                points.len(),
                point.lat,
                point.lng,
                hits.len(),
                fresh.len()
            );

            self.sleeper.sleep(self.point_pause).await;
        }

        (region_ids.sorted_ids(), coordinates)
    }

    /// 不經探測，直接依識別碼取得詳情
    pub async fn fetch_details(&self, ids: &[ListingId], individually: bool) -> RegionHarvest {
        let mut context = HarvestContext::new();
        let unique = context.claim(ids);
        if unique.len() < ids.len() {
            tracing::info!("  {} duplicate ids dropped", ids.len() - unique.len());
        }

        let report = if individually {
            self.fetcher.fetch_individually(&unique).await
        } else {
            self.fetcher.fetch(&unique).await
        };

        RegionHarvest {
            region_name: "details".to_string(),
            discovered_ids: unique.clone(),
            fresh_ids: unique,
            unrecovered_ids: report.unrecovered.clone(),
            records: report.into_records(),
            probe_coordinates: HashMap::new(),
            error: None,
        }
    }
}
