use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tabload_codec::{DEFAULT_ENCODING, resolve_encoding};

pub const DEFAULT_CONFIG_PATH: &str = "tabload.toml";
pub const DATABASE_URL_VARS: [&str; 2] = ["TABLOAD_DATABASE_URL", "DATABASE_URL"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("{0}")]
    Invalid(String),
}

/// Contents of `tabload.toml`; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub connection_string: Option<String>,
    pub schema: Option<String>,
    pub import: ImportSection,
    pub export: ExportSection,
    pub realign: RealignSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportSection {
    pub folder: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportSection {
    pub folder: Option<PathBuf>,
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RealignSection {
    pub key_prefix: Option<String>,
    pub script: Option<PathBuf>,
}

impl FileConfig {
    /// Load `path`, or the default location when `path` is `None`.
    ///
    /// A missing default file yields an empty config; a missing explicit one
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        if !explicit && !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Values given on the command line; they win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub connection_string: Option<String>,
    pub schema: Option<String>,
    pub import_folder: Option<PathBuf>,
    pub export_folder: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub encoding: Option<String>,
    pub key_prefix: Option<String>,
    pub script: Option<PathBuf>,
}

/// Effective, validated configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    #[serde(skip_serializing)]
    pub connection_string: String,
    pub engine: &'static str,
    pub schema: String,
    pub import_folder: PathBuf,
    pub batch_size: usize,
    pub import_encoding: String,
    pub export_folder: PathBuf,
    pub export_encoding: String,
    pub key_prefix: String,
    /// Realignment script path; the run directory is used when unset.
    pub script: Option<PathBuf>,
}

impl Settings {
    /// Merge file, environment and command line, then validate.
    pub fn resolve<F>(file: FileConfig, env: F, overrides: Overrides) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_url = DATABASE_URL_VARS
            .iter()
            .find_map(|name| env(name).filter(|value| !value.trim().is_empty()));

        let connection_string = overrides
            .connection_string
            .or(env_url)
            .or(file.connection_string)
            .ok_or_else(|| {
                ConfigError::Invalid(
                    "connection string is required (--conn, TABLOAD_DATABASE_URL, DATABASE_URL or connection_string)"
                        .to_string(),
                )
            })?;
        let engine = detect_engine(&connection_string)?;

        // --encoding applies to whichever command is running.
        let import_encoding = overrides
            .encoding
            .clone()
            .or(file.import.encoding)
            .unwrap_or_else(|| DEFAULT_ENCODING.to_string());
        let export_encoding = overrides
            .encoding
            .or(file.export.encoding)
            .unwrap_or_else(|| DEFAULT_ENCODING.to_string());

        let settings = Self {
            connection_string,
            engine,
            schema: overrides
                .schema
                .or(file.schema)
                .unwrap_or_else(|| "public".to_string()),
            import_folder: overrides
                .import_folder
                .or(file.import.folder)
                .unwrap_or_else(|| PathBuf::from(".")),
            batch_size: overrides
                .batch_size
                .or(file.import.batch_size)
                .unwrap_or(1000),
            import_encoding,
            export_folder: overrides
                .export_folder
                .or(file.export.folder)
                .unwrap_or_else(|| PathBuf::from("export")),
            export_encoding,
            key_prefix: overrides
                .key_prefix
                .or(file.realign.key_prefix)
                .unwrap_or_else(|| "SEQ_".to_string()),
            script: overrides.script.or(file.realign.script),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".to_string()));
        }
        if self.schema.trim().is_empty() {
            return Err(ConfigError::Invalid("schema must not be empty".to_string()));
        }
        if self.key_prefix.is_empty() {
            return Err(ConfigError::Invalid("key_prefix must not be empty".to_string()));
        }
        for label in [&self.import_encoding, &self.export_encoding] {
            resolve_encoding(label).map_err(|err| ConfigError::Invalid(err.to_string()))?;
        }
        Ok(())
    }
}

fn detect_engine(conn: &str) -> Result<&'static str, ConfigError> {
    if conn.starts_with("postgres://") || conn.starts_with("postgresql://") {
        Ok("postgres")
    } else {
        Err(ConfigError::Invalid(
            "unsupported engine: only postgres:// connection strings are accepted".to_string(),
        ))
    }
}
