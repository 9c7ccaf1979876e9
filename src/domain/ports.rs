use crate::domain::model::{Coordinate, RegionHarvest, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 區域名稱 → 座標。失敗只影響該區域
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, region: &str) -> Result<Coordinate>;

    fn name(&self) -> &str;
}

/// 所有固定間隔的等待都經過這裡，測試時可以記錄而不真的等待
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<RegionHarvest>>;
    async fn transform(&self, data: Vec<RegionHarvest>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
