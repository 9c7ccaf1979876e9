use crate::config::HarvestConfig;
use crate::utils::error::{HarvestError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use std::path::Path;

const VALID_FORMATS: [&str; 2] = ["csv", "json"];

impl HarvestConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| HarvestError::Config {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${ZIGBANG_PROXY})；未定義的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| HarvestError::Config {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_list("provider.probe_endpoints", &self.provider.probe_endpoints)?;
        for endpoint in &self.provider.probe_endpoints {
            validation::validate_url("provider.probe_endpoints", endpoint)?;
        }
        validation::validate_url("provider.detail_endpoint", &self.provider.detail_endpoint)?;
        validation::validate_url("provider.item_endpoint", &self.provider.item_endpoint)?;
        validation::validate_positive_number(
            "provider.probe_timeout_seconds",
            self.provider.probe_timeout_seconds as usize,
            1,
        )?;

        validation::validate_range("grid.radius_km", self.grid.radius_km, 0.0, 50.0)?;
        validation::validate_range("grid.steps", self.grid.steps, 1, 25)?;

        validation::validate_positive_number("fetch.chunk_size", self.fetch.chunk_size, 1)?;
        validation::validate_positive_number(
            "fetch.max_attempts",
            self.fetch.max_attempts as usize,
            1,
        )?;

        validation::validate_non_empty_list("geocoder.order", &self.geocoder.order)?;
        validation::validate_url("geocoder.search_endpoint", &self.geocoder.search_endpoint)?;
        validation::validate_url("geocoder.nominatim_endpoint", &self.geocoder.nominatim_endpoint)?;

        validation::validate_path("load.output_path", &self.load.output_path)?;
        for format in &self.load.output_formats {
            if !VALID_FORMATS.contains(&format.to_ascii_lowercase().as_str()) {
                return Err(HarvestError::InvalidConfigValue {
                    field: "load.output_formats".to_string(),
                    value: format.clone(),
                    reason: format!(
                        "Unsupported format. Valid formats: {}",
                        VALID_FORMATS.join(", ")
                    ),
                });
            }
        }
        if let Some(filename) = self.load.zip_filename() {
            validation::validate_non_empty_string("load.compression.filename", filename)?;
        }

        Ok(())
    }
}

impl Validate for HarvestConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeocoderKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = HarvestConfig::from_toml_str("").unwrap();

        assert_eq!(config.provider.probe_endpoints.len(), 2);
        assert_eq!(config.grid.steps, 3);
        assert_eq!(config.fetch.chunk_size, 10);
        assert_eq!(config.fetch.retry_policy().max_attempts, 3);
        assert_eq!(
            config.geocoder.order,
            vec![GeocoderKind::ProviderSearch, GeocoderKind::Nominatim]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_sections() {
        let toml_content = r#"
[grid]
radius_km = 0.8

[fetch]
chunk_size = 15
base_delay_ms = 250

[geocoder]
order = ["nominatim"]

[load]
output_path = "./seoul_data"
compression = { enabled = true, filename = "harvest.zip" }
"#;

        let config = HarvestConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.grid.radius_km, 0.8);
        assert_eq!(config.grid.steps, 3);
        assert_eq!(config.fetch.chunk_size, 15);
        assert_eq!(config.fetch.max_attempts, 3);
        assert_eq!(
            config.fetch.retry_policy().backoff_delay(2),
            std::time::Duration::from_millis(500)
        );
        assert_eq!(config.geocoder.order, vec![GeocoderKind::Nominatim]);
        assert_eq!(config.load.zip_filename(), Some("harvest.zip"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_HARVEST_DETAIL_ENDPOINT", "https://detail.test/items/list");

        let toml_content = r#"
[provider]
detail_endpoint = "${TEST_HARVEST_DETAIL_ENDPOINT}"
"#;

        let config = HarvestConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.provider.detail_endpoint, "https://detail.test/items/list");

        std::env::remove_var("TEST_HARVEST_DETAIL_ENDPOINT");
    }

    #[test]
    fn test_config_validation() {
        let config = HarvestConfig::from_toml_str("[fetch]\nchunk_size = 0\n").unwrap();
        assert!(config.validate().is_err());

        let config = HarvestConfig::from_toml_str("[provider]\nprobe_endpoints = []\n").unwrap();
        assert!(config.validate().is_err());

        let config = HarvestConfig::from_toml_str("[provider]\ndetail_endpoint = \"invalid-url\"\n").unwrap();
        assert!(config.validate().is_err());

        let config = HarvestConfig::from_toml_str("[load]\noutput_formats = [\"xlsx\"]\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_grid_steps_range() {
        for (steps, valid) in [(0, false), (1, true), (25, true), (26, false)] {
            let config = HarvestConfig::from_toml_str(&format!("[grid]\nsteps = {}\n", steps)).unwrap();
            assert_eq!(config.validate().is_ok(), valid, "steps = {}", steps);
        }
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = HarvestConfig::from_toml_str("[grid\nsteps = ").unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[grid]\nsteps = 5\n").unwrap();

        let config = HarvestConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.grid.steps, 5);
    }
}
