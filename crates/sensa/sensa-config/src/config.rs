use sensa_events::ConsumerType;
use sensa_fetcher::FetcherConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct SensaConfig {
    #[serde(default = "defaults::shm_dir")]
    pub shm_dir: PathBuf,
    #[serde(default = "defaults::region_prefix")]
    pub region_prefix: String,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    #[serde(default = "defaults::read_retry_limit")]
    pub read_retry_limit: usize,
    #[serde(default = "defaults::poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "defaults::consumers")]
    pub consumers: Vec<String>,
    /// Types the simulated producer reports as missing hardware.
    #[serde(default)]
    pub absent: Vec<String>,
    #[serde(default = "defaults::descriptor_path")]
    pub descriptor_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("unknown consumer type '{0}'")]
    UnknownConsumer(String),
}

mod defaults {
    use sensa_events::ConsumerType;
    use std::path::PathBuf;

    pub fn shm_dir() -> PathBuf {
        sensa_fetcher::default_shm_dir()
    }

    pub fn region_prefix() -> String {
        "sensa".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }

    pub fn read_retry_limit() -> usize {
        10
    }

    pub fn poll_interval_ms() -> u64 {
        20
    }

    pub fn consumers() -> Vec<String> {
        ConsumerType::ALL.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn descriptor_path() -> PathBuf {
        "/tmp/sensa_descriptors.json".into()
    }
}

impl Default for SensaConfig {
    fn default() -> Self {
        Self {
            shm_dir: defaults::shm_dir(),
            region_prefix: defaults::region_prefix(),
            log_level: defaults::log_level(),
            read_retry_limit: defaults::read_retry_limit(),
            poll_interval_ms: defaults::poll_interval_ms(),
            consumers: defaults::consumers(),
            absent: Vec::new(),
            descriptor_path: defaults::descriptor_path(),
        }
    }
}

fn parse_consumers(names: &[String]) -> Result<Vec<ConsumerType>, ConfigError> {
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let consumer = ConsumerType::from_name(name)
            .ok_or_else(|| ConfigError::UnknownConsumer(name.clone()))?;
        if !out.contains(&consumer) {
            out.push(consumer);
        }
    }
    Ok(out)
}

impl SensaConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let toml_to_str = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config = Self::from_toml(&toml_to_str)?;
        Ok(config)
    }

    /// Parses and validates the consumer lists up front, so a typo fails at
    /// load time rather than when the hub starts streaming.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: SensaConfig = toml::from_str(s)?;
        parse_consumers(&config.consumers)?;
        parse_consumers(&config.absent)?;
        Ok(config)
    }

    /// The types the hub should start, in config order, without duplicates.
    pub fn consumer_types(&self) -> Result<Vec<ConsumerType>, ConfigError> {
        parse_consumers(&self.consumers)
    }

    pub fn absent_types(&self) -> Result<Vec<ConsumerType>, ConfigError> {
        parse_consumers(&self.absent)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            shm_dir: self.shm_dir.clone(),
            region_prefix: self.region_prefix.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_takes_every_default() {
        let config = SensaConfig::from_toml("").unwrap();
        assert_eq!(config.region_prefix, "sensa");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.read_retry_limit, 10);
        assert_eq!(config.poll_interval(), Duration::from_millis(20));
        assert_eq!(config.consumer_types().unwrap(), ConsumerType::ALL.to_vec());
        assert!(config.absent_types().unwrap().is_empty());
        assert_eq!(config.descriptor_path, PathBuf::from("/tmp/sensa_descriptors.json"));
    }

    #[test]
    fn explicit_fields_override_defaults() {
        let config = SensaConfig::from_toml(
            r#"
            shm_dir = "/tmp/sensa-test"
            region_prefix = "hub"
            log_level = "debug"
            read_retry_limit = 4
            poll_interval_ms = 5
            consumers = ["light", "motion", "light"]
            absent = ["orientation_absolute"]
            "#,
        )
        .unwrap();
        assert_eq!(config.shm_dir, PathBuf::from("/tmp/sensa-test"));
        assert_eq!(config.region_prefix, "hub");
        assert_eq!(config.read_retry_limit, 4);
        assert_eq!(config.fetcher_config().region_prefix, "hub");
        assert_eq!(
            config.consumer_types().unwrap(),
            vec![ConsumerType::Light, ConsumerType::Motion]
        );
        assert_eq!(
            config.absent_types().unwrap(),
            vec![ConsumerType::OrientationAbsolute]
        );
    }

    #[test]
    fn unknown_consumer_is_rejected() {
        let err = SensaConfig::from_toml(r#"consumers = ["gyro"]"#).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownConsumer(name) if name == "gyro"));
    }

    #[test]
    fn unknown_field_is_a_parse_error() {
        let err = SensaConfig::from_toml("capacity = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = \"trace\"").unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let config = SensaConfig::load(path).unwrap();
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn missing_file_reports_its_path() {
        let err = SensaConfig::load("/nonexistent/sensa.toml").unwrap_err();
        match err {
            ConfigError::Read { path, .. } => assert_eq!(path, "/nonexistent/sensa.toml"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
