use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Zip operation failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    Config { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfig { field: String },

    #[error("Geocoding failed for '{region}': {message}")]
    Geocode { region: String, message: String },

    #[error("Data processing error: {message}")]
    Processing { message: String },
}

impl HarvestError {
    pub fn geocode(region: &str, message: impl Into<String>) -> Self {
        HarvestError::Geocode {
            region: region.to_string(),
            message: message.into(),
        }
    }

    /// 配置類錯誤在執行前即可發現，重試沒有意義
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            HarvestError::Config { .. }
                | HarvestError::InvalidConfigValue { .. }
                | HarvestError::MissingConfig { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
