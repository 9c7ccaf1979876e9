use crate::core::retry::{AttemptOutcome, Classification, FailureKind, RetryPolicy, RetryState};
use crate::domain::model::{ListingId, ListingRecord};
use crate::domain::ports::Sleeper;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CHUNK_SIZE: usize = 10;
pub const DEFAULT_CHUNK_PAUSE: Duration = Duration::from_secs(1);
pub const DEFAULT_ITEM_PAUSE: Duration = Duration::from_millis(500);
pub const DEFAULT_BULK_TIMEOUT: Duration = Duration::from_secs(25);
pub const DEFAULT_ITEM_TIMEOUT: Duration = Duration::from_secs(15);

/// 詳情來源。每次呼叫就是一次嘗試，重試由 [`BatchDetailFetcher`] 負責
#[async_trait]
pub trait DetailSource: Send + Sync {
    /// 批次查詢：`{"itemIds": [...]}` → `{"items": [...]}`
    async fn fetch_chunk(&self, ids: &[ListingId]) -> AttemptOutcome<Vec<ListingRecord>>;

    /// 單筆查詢
    async fn fetch_one(&self, id: ListingId) -> AttemptOutcome<ListingRecord>;
}

pub struct HttpDetailSource {
    client: Client,
    bulk_endpoint: String,
    item_endpoint: String,
    item_query: Vec<(String, String)>,
    bulk_timeout: Duration,
    item_timeout: Duration,
}

impl HttpDetailSource {
    pub fn new(client: Client, bulk_endpoint: String, item_endpoint: String) -> Self {
        Self {
            client,
            bulk_endpoint,
            item_endpoint,
            item_query: Vec::new(),
            bulk_timeout: DEFAULT_BULK_TIMEOUT,
            item_timeout: DEFAULT_ITEM_TIMEOUT,
        }
    }

    pub fn with_item_query(mut self, item_query: Vec<(String, String)>) -> Self {
        self.item_query = item_query;
        self
    }

    pub fn with_timeouts(mut self, bulk_timeout: Duration, item_timeout: Duration) -> Self {
        self.bulk_timeout = bulk_timeout;
        self.item_timeout = item_timeout;
        self
    }

    fn item_url(&self, id: ListingId) -> String {
        self.item_endpoint.replace("{item_id}", &id.to_string())
    }

    async fn read_json(request: reqwest::RequestBuilder) -> AttemptOutcome<Value> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return AttemptOutcome::Network(e.to_string()),
        };

        let status = response.status().as_u16();
        if status != 200 {
            return AttemptOutcome::Status(status);
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return AttemptOutcome::Network(e.to_string()),
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(body) => AttemptOutcome::Success(body),
            Err(e) => AttemptOutcome::Malformed(e.to_string()),
        }
    }
}

fn into_records(items: &[Value]) -> Vec<ListingRecord> {
    items
        .iter()
        .filter_map(|item| item.as_object().cloned().map(ListingRecord::new))
        .collect()
}

#[async_trait]
impl DetailSource for HttpDetailSource {
    async fn fetch_chunk(&self, ids: &[ListingId]) -> AttemptOutcome<Vec<ListingRecord>> {
        let request = self
            .client
            .post(&self.bulk_endpoint)
            .json(&json!({ "itemIds": ids }))
            .timeout(self.bulk_timeout);

        match Self::read_json(request).await {
            AttemptOutcome::Success(body) => {
                // items 欄位缺少時視為空結果
                let records = body
                    .get("items")
                    .and_then(Value::as_array)
                    .map(|items| into_records(items))
                    .unwrap_or_default();
                AttemptOutcome::Success(records)
            }
            AttemptOutcome::Status(status) => AttemptOutcome::Status(status),
            AttemptOutcome::Network(message) => AttemptOutcome::Network(message),
            AttemptOutcome::Malformed(message) => AttemptOutcome::Malformed(message),
        }
    }

    async fn fetch_one(&self, id: ListingId) -> AttemptOutcome<ListingRecord> {
        let request = self
            .client
            .get(self.item_url(id))
            .query(&self.item_query)
            .timeout(self.item_timeout);

        match Self::read_json(request).await {
            AttemptOutcome::Success(Value::Object(data)) => {
                AttemptOutcome::Success(ListingRecord::new(data))
            }
            AttemptOutcome::Success(other) => {
                AttemptOutcome::Malformed(format!("expected a JSON object, got {}", other))
            }
            AttemptOutcome::Status(status) => AttemptOutcome::Status(status),
            AttemptOutcome::Network(message) => AttemptOutcome::Network(message),
            AttemptOutcome::Malformed(message) => AttemptOutcome::Malformed(message),
        }
    }
}

/// 單一 chunk 進行中的狀態：`Pending → Attempting → {Retrying → Attempting | 結束}`
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkState {
    Pending,
    Attempting(RetryState),
    Retrying(RetryState),
}

/// 單一 chunk 的終止結果
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome<T> {
    Succeeded { payload: T, attempts: u32 },
    Failed { retry: RetryState, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChunkStatus {
    Succeeded { records: usize },
    Failed {
        reason: String,
        last_failure: Option<FailureKind>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkReport {
    pub index: usize,
    pub ids: Vec<ListingId>,
    pub attempts: u32,
    pub status: ChunkStatus,
}

impl ChunkReport {
    pub fn is_success(&self) -> bool {
        matches!(self.status, ChunkStatus::Succeeded { .. })
    }
}

/// 部分成功的結果；呼叫端需自行比對輸入與輸出數量
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    pub records: Vec<ListingRecord>,
    pub chunks: Vec<ChunkReport>,
    pub unrecovered: Vec<ListingId>,
}

impl FetchReport {
    pub fn failed_chunks(&self) -> usize {
        self.chunks.iter().filter(|chunk| !chunk.is_success()).count()
    }

    pub fn into_records(self) -> Vec<ListingRecord> {
        self.records
    }
}

/// 依序切成最多 `chunk_size` 個一組；最後一組可能較小
pub fn partition(ids: &[ListingId], chunk_size: usize) -> Vec<&[ListingId]> {
    ids.chunks(chunk_size.max(1)).collect()
}

pub struct BatchDetailFetcher {
    source: Arc<dyn DetailSource>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    chunk_size: usize,
    chunk_pause: Duration,
    item_pause: Duration,
}

impl BatchDetailFetcher {
    pub fn new(source: Arc<dyn DetailSource>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            source,
            sleeper,
            policy: RetryPolicy::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_pause: DEFAULT_CHUNK_PAUSE,
            item_pause: DEFAULT_ITEM_PAUSE,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_pauses(mut self, chunk_pause: Duration, item_pause: Duration) -> Self {
        self.chunk_pause = chunk_pause;
        self.item_pause = item_pause;
        self
    }

    /// 以批次端點取得詳情。單一 chunk 失敗只會被丟棄並記錄，不會中斷整個流程
    pub async fn fetch(&self, ids: &[ListingId]) -> FetchReport {
        let chunks = partition(ids, self.chunk_size);
        let total = chunks.len();
        let mut report = FetchReport::default();

        tracing::info!(
            "📦 Fetching details for {} ids in {} chunks (size {})",
            ids.len(),
            total,
            self.chunk_size
        );

        for (index, chunk) in chunks.into_iter().enumerate() {
            let label = format!("chunk {}/{}", index + 1, total);
            let outcome = self.drive(&label, || self.source.fetch_chunk(chunk)).await;
            self.settle(&mut report, index, chunk, outcome, |records| records);

            self.sleeper.sleep(self.chunk_pause).await;
        }

        report
    }

    /// 逐筆使用單筆端點，每筆之間固定暫停
    pub async fn fetch_individually(&self, ids: &[ListingId]) -> FetchReport {
        let total = ids.len();
        let mut report = FetchReport::default();

        for (index, id) in ids.iter().enumerate() {
            let label = format!("item {} ({}/{})", id, index + 1, total);
            let outcome = self.drive(&label, || self.source.fetch_one(*id)).await;
            self.settle(&mut report, index, std::slice::from_ref(id), outcome, |record| {
                vec![record]
            });

            self.sleeper.sleep(self.item_pause).await;
        }

        report
    }

    fn settle<T>(
        &self,
        report: &mut FetchReport,
        index: usize,
        ids: &[ListingId],
        outcome: ChunkOutcome<T>,
        into_records: impl FnOnce(T) -> Vec<ListingRecord>,
    ) {
        match outcome {
            ChunkOutcome::Succeeded { payload, attempts } => {
                let records = into_records(payload);
                tracing::info!(
                    "  ✅ chunk {}: {} records (attempts: {})",
                    index + 1,
                    records.len(),
                    attempts
                );
                report.chunks.push(ChunkReport {
                    index,
                    ids: ids.to_vec(),
                    attempts,
                    status: ChunkStatus::Succeeded {
                        records: records.len(),
                    },
                });
                report.records.extend(records);
            }
            ChunkOutcome::Failed { retry, reason } => {
                tracing::warn!(
                    "  ❌ chunk {} dropped after {} attempt(s): {}; unrecovered ids: {:?}",
                    index + 1,
                    retry.attempt,
                    reason,
                    ids
                );
                report.chunks.push(ChunkReport {
                    index,
                    ids: ids.to_vec(),
                    attempts: retry.attempt,
                    status: ChunkStatus::Failed {
                        reason,
                        last_failure: retry.last_failure,
                    },
                });
                report.unrecovered.extend_from_slice(ids);
            }
        }
    }

    /// 推進狀態機直到成功或放棄
    async fn drive<T, F, Fut>(&self, label: &str, mut attempt: F) -> ChunkOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AttemptOutcome<T>>,
    {
        let mut state = ChunkState::Pending;
        loop {
            state = match state {
                ChunkState::Pending => ChunkState::Attempting(RetryState {
                    attempt: 1,
                    last_failure: None,
                }),
                ChunkState::Attempting(mut retry) => {
                    let outcome = attempt().await;
                    let classification = self.policy.classify(&outcome);
                    retry.record(classification);

                    match (classification, outcome) {
                        (Classification::Success, AttemptOutcome::Success(payload)) => {
                            return ChunkOutcome::Succeeded {
                                payload,
                                attempts: retry.attempt,
                            };
                        }
                        (Classification::Retryable, outcome)
                            if self.policy.has_attempts_left(retry.attempt) =>
                        {
                            tracing::warn!(
                                "  ⚠️ {} attempt {}/{} failed ({}), retrying",
                                label,
                                retry.attempt,
                                self.policy.max_attempts,
                                outcome.describe()
                            );
                            ChunkState::Retrying(retry)
                        }
                        (_, outcome) => {
                            return ChunkOutcome::Failed {
                                retry,
                                reason: outcome.describe(),
                            };
                        }
                    }
                }
                ChunkState::Retrying(retry) => {
                    let delay = self.policy.backoff_delay(retry.attempt);
                    tracing::debug!("  {} backing off for {:?}", label, delay);
                    self.sleeper.sleep(delay).await;
                    ChunkState::Attempting(RetryState {
                        attempt: retry.attempt + 1,
                        ..retry
                    })
                }
            };
        }
    }
}
