use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// 會自行恢復的狀態碼：限流與暫時性的伺服器錯誤
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// 單次請求的結果
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome<T> {
    /// 200 且內容可解析
    Success(T),
    /// 非 200 的 HTTP 狀態
    Status(u16),
    /// 連線、逾時等網路層錯誤
    Network(String),
    /// 200 但內容不是合法 JSON
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Success,
    Retryable,
    Fatal,
}

/// 最近一次失敗的類別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transient,
    Permanent,
}

/// 單一 chunk 的嘗試次數與最近一次失敗
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryState {
    pub attempt: u32,
    pub last_failure: Option<FailureKind>,
}

impl RetryState {
    pub fn record(&mut self, classification: Classification) {
        self.last_failure = match classification {
            Classification::Success => None,
            Classification::Retryable => Some(FailureKind::Transient),
            Classification::Fatal => Some(FailureKind::Permanent),
        };
    }
}

impl<T> AttemptOutcome<T> {
    pub fn describe(&self) -> String {
        match self {
            AttemptOutcome::Success(_) => "HTTP 200".to_string(),
            AttemptOutcome::Status(status) => format!("HTTP {}", status),
            AttemptOutcome::Network(message) => format!("network error: {}", message),
            AttemptOutcome::Malformed(message) => format!("malformed body: {}", message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn classify<T>(&self, outcome: &AttemptOutcome<T>) -> Classification {
        match outcome {
            AttemptOutcome::Success(_) => Classification::Success,
            AttemptOutcome::Status(200) => Classification::Success,
            AttemptOutcome::Status(status) if RETRYABLE_STATUSES.contains(status) => {
                Classification::Retryable
            }
            AttemptOutcome::Status(_) => Classification::Fatal,
            AttemptOutcome::Network(_) => Classification::Retryable,
            AttemptOutcome::Malformed(_) => Classification::Fatal,
        }
    }

    /// 線性退避：`base_delay * attempt`，attempt 從 1 開始
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    pub fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
