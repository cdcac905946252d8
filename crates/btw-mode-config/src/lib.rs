use btw_mode_engine::decorating::heading::{HeadingError, HeadingSpec, LabelFn};
use btw_mode_engine::fetch::{JsonFileSource, MemorySource, Sources};
use btw_mode_engine::{BiblItem, SemanticFieldRecord};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Unknown label function {0:?} (expected sense, sense-head or subsense)")]
    UnknownLabelFunction(String),

    #[error("Invalid heading for {selector:?}: {source}")]
    InvalidHeading {
        selector: String,
        source: HeadingError,
    },
}

/// A heading table entry added or replaced from the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadingOverride {
    pub selector: String,
    pub heading: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// Collapse kind; the section is collapsible when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapse: Option<String>,
}

impl HeadingOverride {
    pub fn to_spec(&self) -> Result<HeadingSpec, ConfigError> {
        let mut spec =
            HeadingSpec::new(&self.selector, &self.heading).map_err(|source| {
                ConfigError::InvalidHeading {
                    selector: self.selector.clone(),
                    source,
                }
            })?;
        if let Some(label) = &self.label {
            let label = LabelFn::from_name(label)
                .ok_or_else(|| ConfigError::UnknownLabelFunction(label.clone()))?;
            spec = spec.with_label(label);
        }
        if let Some(suffix) = &self.suffix {
            spec = spec.with_suffix(suffix);
        }
        if let Some(kind) = &self.collapse {
            spec = spec.with_collapse(kind, &[]);
        }
        Ok(spec)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub data_path: PathBuf,
    /// JSON object mapping bibliography references to entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bibliography: Option<PathBuf>,
    /// JSON object mapping semantic field references to records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_fields: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headings: Vec<HeadingOverride>,
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the loaded paths
        config.data_path = Self::expand_path(&config.data_path).unwrap_or(config.data_path);
        config.bibliography = config
            .bibliography
            .map(|p| Self::expand_path(&p).unwrap_or(p));
        config.semantic_fields = config
            .semantic_fields
            .map(|p| Self::expand_path(&p).unwrap_or(p));

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/btw-mode");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Record sources for a session; missing paths give empty sources
    pub fn sources(&self) -> Sources {
        Sources {
            bibliography: match &self.bibliography {
                Some(path) => Box::new(JsonFileSource::<BiblItem>::new(path)),
                None => Box::new(MemorySource::<BiblItem>::new()),
            },
            semantic_fields: match &self.semantic_fields {
                Some(path) => Box::new(JsonFileSource::<SemanticFieldRecord>::new(path)),
                None => Box::new(MemorySource::<SemanticFieldRecord>::new()),
            },
        }
    }

    /// Heading overrides in file order
    pub fn heading_specs(&self) -> Result<Vec<HeadingSpec>, ConfigError> {
        self.headings.iter().map(HeadingOverride::to_spec).collect()
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}
