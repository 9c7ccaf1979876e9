use crate::core::Pipeline;
use crate::utils::error::Result;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting harvest...");

        // Extract
        let harvests = self.pipeline.extract().await?;
        let failed = harvests.iter().filter(|h| h.is_failed()).count();
        let fetched: usize = harvests.iter().map(|h| h.records.len()).sum();
        let unrecovered: usize = harvests.iter().map(|h| h.unrecovered_ids.len()).sum();
        tracing::info!(
            "Extracted {} records from {} regions ({} failed, {} ids unrecovered)",
            fetched,
            harvests.len(),
            failed,
            unrecovered
        );

        // Transform
        let transformed = self.pipeline.transform(harvests).await?;
        tracing::info!("Transformed {} rows", transformed.rows.len());

        // Load
        let output_path = self.pipeline.load(transformed).await?;
        tracing::info!("Output saved to: {}", output_path);

        Ok(output_path)
    }
}
