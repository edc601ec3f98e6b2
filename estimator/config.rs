use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use thiserror::Error;

/// Errors raised while reading, writing or validating an estimator configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse configuration TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize configuration TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("resample_count must be at least 1 (found {0})")]
    InvalidResampleCount(u32),
    #[error("end_of_followup must be a positive integer time (found {0})")]
    InvalidEndOfFollowup(u32),
    #[error("'{0}' was not supplied on the command line or in the configuration file")]
    MissingSetting(&'static str),
}

/// The two caller-supplied parameters of the estimator. Arm coding, status coding
/// and the critical value are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Number of bootstrap replicates `B`; resamples `1..=B` feed the variance.
    pub resample_count: u32,
    /// Upper bound of the integer output grid `[0, end_of_followup]`.
    pub end_of_followup: u32,
}

impl EstimatorConfig {
    pub fn new(resample_count: u32, end_of_followup: u32) -> Result<Self, ConfigError> {
        let config = Self {
            resample_count,
            end_of_followup,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resample_count < 1 {
            return Err(ConfigError::InvalidResampleCount(self.resample_count));
        }
        if self.end_of_followup < 1 {
            return Err(ConfigError::InvalidEndOfFollowup(self.end_of_followup));
        }
        Ok(())
    }

    /// Number of points on the output grid.
    pub fn grid_len(&self) -> usize {
        self.end_of_followup as usize + 1
    }

    pub fn save(&self, path: &str) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        Ok(())
    }

    /// Loads and validates a configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let toml_string = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&toml_string)?;
        config.validate()?;
        Ok(config)
    }
}

/// Partially specified settings, merged from a config file and command-line overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub resample_count: Option<u32>,
    pub end_of_followup: Option<u32>,
}

impl ConfigOverrides {
    /// Resolves the final configuration. Explicit overrides win over the file.
    pub fn resolve(self, base: Option<EstimatorConfig>) -> Result<EstimatorConfig, ConfigError> {
        let resample_count = self
            .resample_count
            .or(base.map(|c| c.resample_count))
            .ok_or(ConfigError::MissingSetting("resample_count"))?;
        let end_of_followup = self
            .end_of_followup
            .or(base.map(|c| c.end_of_followup))
            .ok_or(ConfigError::MissingSetting("end_of_followup"))?;
        EstimatorConfig::new(resample_count, end_of_followup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn config_round_trips_through_toml() {
        let config = EstimatorConfig::new(200, 365).unwrap();
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        config.save(path).unwrap();
        let loaded = EstimatorConfig::load(path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn zero_resamples_rejected() {
        match EstimatorConfig::new(0, 10) {
            Err(ConfigError::InvalidResampleCount(0)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn zero_followup_rejected_on_load() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "resample_count = 5\nend_of_followup = 0\n").unwrap();
        let err = EstimatorConfig::load(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndOfFollowup(0)));
    }

    #[test]
    fn overrides_take_precedence_over_file() {
        let base = EstimatorConfig::new(100, 30).unwrap();
        let resolved = ConfigOverrides {
            resample_count: Some(20),
            end_of_followup: None,
        }
        .resolve(Some(base))
        .unwrap();
        assert_eq!(resolved, EstimatorConfig::new(20, 30).unwrap());
    }

    #[test]
    fn missing_setting_is_reported_by_name() {
        let err = ConfigOverrides {
            resample_count: Some(20),
            end_of_followup: None,
        }
        .resolve(None)
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingSetting("end_of_followup")));
    }
}
