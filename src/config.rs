//! Runtime configuration.
//!
//! Every section falls back to defaults, so a YAML document only needs the
//! values it overrides:
//!
//! ```yaml
//! logger:
//!   level: debug
//!   format: json
//! resolver:
//!   workers: 8
//!   strategy: tag
//! search:
//!   stages: [cache, ontology_fallback, string_expansion]
//! curation:
//!   cutoff_score: 80
//!   cutoff_percent: 0.8
//! ```

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    annotation::LocatorStrategy,
    curation::ProfileThresholds,
    logger::{Format, LogLevel},
    search::{ProcessorKind, StageKind, DEFAULT_MERGE_LIMIT, DEFAULT_PARTIAL_STRING_BOOST},
};

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read configuration file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid `{field}`: {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Top level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logger: LoggerSettings,
    pub resolver: ResolverSettings,
    pub search: SearchSettings,
    pub curation: CurationSettings,
}

impl Config {
    /// Parses and validates a YAML document.
    ///
    /// # Errors
    ///
    /// Fails on malformed YAML or out of range values.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a YAML file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or does not validate.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Checks value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolver.workers == 0 {
            return Err(ConfigError::invalid("resolver.workers", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.search.partial_string_boost) {
            return Err(ConfigError::invalid(
                "search.partial_string_boost",
                "must be within [0, 1]",
            ));
        }
        if self.search.merge_limit == 0 {
            return Err(ConfigError::invalid("search.merge_limit", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.curation.cutoff_percent) {
            return Err(ConfigError::invalid(
                "curation.cutoff_percent",
                "must be a fraction within [0, 1]",
            ));
        }
        if self.curation.exclusion_delimiter.is_empty() {
            return Err(ConfigError::invalid(
                "curation.exclusion_delimiter",
                "must not be empty",
            ));
        }
        Ok(())
    }
}

/// Logger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerSettings {
    /// Enable log write to stdout
    pub enable: bool,

    /// Set the logger level.
    ///
    /// * options: `trace` | `debug` | `info` | `warn` | `error`
    pub level: LogLevel,

    /// Set the logger format.
    ///
    /// * options: `compact` | `pretty` | `json`
    pub format: Format,

    /// Colourise output.
    pub ansi: bool,

    /// Replaces the default filter, e.g. `zooma=trace,moka=warn`.
    /// `RUST_LOG` still wins when set.
    pub override_filter: Option<String>,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            enable: true,
            level: LogLevel::Info,
            format: Format::Compact,
            ansi: true,
            override_filter: None,
        }
    }
}

/// Annotation resolution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Concurrent resolution workers, also the submission queue capacity.
    pub workers: usize,
    pub strategy: LocatorStrategy,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            strategy: LocatorStrategy::default(),
        }
    }
}

/// Search pipeline composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Stages from outermost to innermost.
    pub stages: Vec<StageKind>,
    /// String processors tried in order by the expansion stage.
    pub processors: Vec<ProcessorKind>,
    pub merge_limit: usize,
    pub partial_string_boost: f32,
    pub cache: CacheSettings,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            stages: vec![StageKind::Cache, StageKind::StringExpansion],
            processors: vec![
                ProcessorKind::Parentheses,
                ProcessorKind::Stopwords,
                ProcessorKind::Conjunction,
            ],
            merge_limit: DEFAULT_MERGE_LIMIT,
            partial_string_boost: DEFAULT_PARTIAL_STRING_BOOST,
            cache: CacheSettings::default(),
        }
    }
}

/// Search results cache sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub max_capacity: u64,
    /// Entries expire this long after insertion; `None` keeps them until evicted.
    pub time_to_live_secs: Option<u64>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            time_to_live_secs: None,
        }
    }
}

/// Edit tolerances for fuzzy value comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzySettings {
    /// Edits must stay strictly below this count.
    pub max_diffs: usize,
    /// Edits relative to the shorter value.
    pub max_pct_diffs: f64,
}

impl Default for FuzzySettings {
    fn default() -> Self {
        Self {
            max_diffs: 3,
            max_pct_diffs: 0.2,
        }
    }
}

/// Automatic curation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurationSettings {
    /// Minimum score for a sole result to be applied automatically.
    pub cutoff_score: f32,
    /// Fraction of the best score results need to be considered at all.
    pub cutoff_percent: f32,
    /// Shorter values are never searched.
    pub min_string_length: usize,
    pub fuzzy: FuzzySettings,
    /// Field separator of exclusion profile lines.
    pub exclusion_delimiter: String,
    /// Joins refs and accessions of compound mappings.
    pub compound_delimiter: String,
    /// Report accessions as `EFO:0000270` rather than `EFO_0000270`.
    pub ols_short_ids: bool,
    /// Report accessions as full IRIs.
    pub long_form_accessions: bool,
}

impl CurationSettings {
    #[must_use]
    pub fn thresholds(&self) -> ProfileThresholds {
        ProfileThresholds {
            cutoff_score: self.cutoff_score,
            cutoff_percent: self.cutoff_percent,
        }
    }
}

impl Default for CurationSettings {
    fn default() -> Self {
        let thresholds = ProfileThresholds::default();
        Self {
            cutoff_score: thresholds.cutoff_score,
            cutoff_percent: thresholds.cutoff_percent,
            min_string_length: 3,
            fuzzy: FuzzySettings::default(),
            exclusion_delimiter: "\t".to_string(),
            compound_delimiter: "|".to_string(),
            ols_short_ids: false,
            long_form_accessions: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, ConfigError};
    use crate::{
        annotation::LocatorStrategy,
        logger::{Format, LogLevel},
        search::StageKind,
    };

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_yaml_str("").expect("defaults");
        assert_eq!(config, Config::default());
        assert_eq!(config.search.stages, vec![StageKind::Cache, StageKind::StringExpansion]);
        assert_eq!(config.curation.exclusion_delimiter, "\t");
    }

    #[test]
    fn partial_documents_override_selected_values() {
        let config = Config::from_yaml_str(
            r"
logger:
  level: debug
  format: json
resolver:
  workers: 8
  strategy: tag
search:
  stages: [ontology_fallback, string_expansion]
  cache:
    time_to_live_secs: 60
curation:
  cutoff_percent: 0.95
  fuzzy:
    max_diffs: 2
",
        )
        .expect("config");

        assert_eq!(config.logger.level, LogLevel::Debug);
        assert_eq!(config.logger.format, Format::Json);
        assert!(config.logger.enable);
        assert_eq!(config.resolver.workers, 8);
        assert_eq!(config.resolver.strategy, LocatorStrategy::Tag);
        assert_eq!(
            config.search.stages,
            vec![StageKind::OntologyFallback, StageKind::StringExpansion]
        );
        assert_eq!(config.search.cache.time_to_live_secs, Some(60));
        assert_eq!(config.search.cache.max_capacity, 10_000);
        assert!((config.curation.cutoff_percent - 0.95).abs() < f32::EPSILON);
        assert_eq!(config.curation.fuzzy.max_diffs, 2);
        assert!((config.curation.fuzzy.max_pct_diffs - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = Config::from_yaml_str("curation:\n  cutoff_percent: 95\n").expect_err("invalid");
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "curation.cutoff_percent"));

        let err = Config::from_yaml_str("resolver:\n  workers: 0\n").expect_err("invalid");
        assert!(err.to_string().contains("resolver.workers"));
    }

    #[test]
    fn unknown_stage_names_fail_to_parse() {
        let err = Config::from_yaml_str("search:\n  stages: [telepathy]\n").expect_err("invalid");
        assert!(matches!(err, ConfigError::Yaml(_)));
    }
}
