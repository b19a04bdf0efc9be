use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::encoding::resolve_label;

#[derive(Debug, Deserialize, Clone)]
pub struct FailsightConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    pub sources: SourcesConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// The two static inputs and the ordered work orders the dashboard iterates.
#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    pub document_path: String,
    pub dataset_path: String,
    pub work_order_ids: Vec<String>,
}

impl SourcesConfig {
    pub fn document_path(&self) -> PathBuf {
        expand_path(&self.document_path)
    }

    pub fn dataset_path(&self) -> PathBuf {
        expand_path(&self.dataset_path)
    }
}

/// Column names and parsing options for the sensor table.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatasetConfig {
    pub work_order_column: String,
    pub sensor_name_column: String,
    pub sensor_id_column: String,
    pub timestamp_column: String,
    pub reading_column: String,
    pub delimiter: char,
    pub fallback_encoding: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            work_order_column: "WorkOrderID".to_string(),
            sensor_name_column: "sensor_name".to_string(),
            sensor_id_column: "sensor_id".to_string(),
            timestamp_column: "datetime".to_string(),
            reading_column: "reading".to_string(),
            delimiter: ',',
            fallback_encoding: "latin1".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PreviewConfig {
    pub rows: usize,
    pub fallback_encoding: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            rows: 5,
            fallback_encoding: "latin1".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8777,
        }
    }
}

impl FailsightConfig {
    /// Load from a TOML file, with `FAILSIGHT__SECTION__KEY` environment overrides.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("FAILSIGHT")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("sources.work_order_ids")
                    .try_parsing(true),
            )
            .build()?;
        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.work_order_ids.is_empty() {
            return Err(ConfigError::Message(
                "sources.work_order_ids must list at least one work order".to_string(),
            ));
        }
        if let Some(blank) = self.sources.work_order_ids.iter().find(|id| id.trim().is_empty()) {
            return Err(ConfigError::Message(format!(
                "sources.work_order_ids contains a blank identifier: {:?}",
                blank
            )));
        }
        if self.preview.rows == 0 {
            return Err(ConfigError::Message("preview.rows must be at least 1".to_string()));
        }
        for (key, label) in [
            ("dataset.fallback_encoding", &self.dataset.fallback_encoding),
            ("preview.fallback_encoding", &self.preview.fallback_encoding),
        ] {
            if resolve_label(label).is_err() {
                return Err(ConfigError::Message(format!(
                    "{} '{}' is not a known text encoding label",
                    key, label
                )));
            }
        }
        Ok(())
    }
}

/// Expand `~` and `$VAR` in a configured path, leaving it untouched if expansion fails.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            tracing::warn!("Could not expand path {}: {}", raw, e);
            PathBuf::from(raw)
        }
    }
}
