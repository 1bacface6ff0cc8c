use std::path::{Path, PathBuf};

use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Yaml};
use snafu::prelude::*;
use tracing::debug;

use crate::config::log_level::{LogLevel, ParseLogLevelError, setup_tracing};
use crate::node::TreeStyle;

const CONFIG_FILE_NAME: &str = "sssh.yaml";

fn get_config_file_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}

/// Settings a host can hand to a [`Shell`](crate::shell::Shell).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellConfig {
    pub log_level: LogLevel,
    pub tree_style: TreeStyle,
}

impl ShellConfig {
    /// Reads `sssh.yaml` from `dir`.
    pub fn read(dir: &Path) -> Result<Self, ConfigError> {
        Self::from_path(get_config_file_path(dir))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Reading config file: {}", path.display());
        let contents = std::fs::read_to_string(path).context(ReadSnafu {
            file_path: path.display().to_string(),
        })?;
        debug!("Successfully read config file: {} bytes", contents.len());

        contents.as_str().try_into()
    }

    /// Installs the tracing subscriber for the configured level.
    pub fn init_tracing(&self) -> bool {
        setup_tracing(&self.log_level)
    }

    fn parse_log_level(top_level: &LinkedHashMap<Yaml, Yaml>) -> Result<LogLevel, ConfigError> {
        match string_entry(top_level, "log_level")? {
            Some(value) => value.parse::<LogLevel>().context(UnknownLogLevelSnafu),
            None => Ok(LogLevel::default()),
        }
    }

    fn parse_tree_style(top_level: &LinkedHashMap<Yaml, Yaml>) -> Result<TreeStyle, ConfigError> {
        let mut style = TreeStyle::default();
        let Some((_, section)) = top_level.iter().find(|(key, _)| key.as_str() == Some("tree"))
        else {
            return Ok(style);
        };

        let section = section
            .as_mapping()
            .ok_or(ConfigError::SectionNotMap { section: "tree" })?;

        if let Some(indent) = string_entry(section, "indent")? {
            style.indent = indent;
        }
        if let Some(branch) = string_entry(section, "branch")? {
            style.branch = branch;
        }
        if let Some(suffix) = string_entry(section, "directory_suffix")? {
            style.directory_suffix = suffix;
        }
        Ok(style)
    }
}

fn string_entry(
    mapping: &LinkedHashMap<Yaml, Yaml>,
    key: &'static str,
) -> Result<Option<String>, ConfigError> {
    match mapping.iter().find(|(k, _)| k.as_str() == Some(key)) {
        None => Ok(None),
        Some((_, value)) => value
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or(ConfigError::InvalidValue { key }),
    }
}

impl TryFrom<&str> for ShellConfig {
    type Error = ConfigError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let contents_vec =
            Yaml::load_from_str(contents).map_err(|e| ConfigError::ParseError { source: e })?;
        let contents = contents_vec.first().ok_or(ConfigError::MalformedConfig)?;

        let top_level = contents
            .as_mapping()
            .ok_or(ConfigError::TopLevelNotMap)?;

        Ok(ShellConfig {
            log_level: Self::parse_log_level(top_level)?,
            tree_style: Self::parse_tree_style(top_level)?,
        })
    }
}

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Failed to read the config file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to parse the config file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Improperly formatted config file"))]
    MalformedConfig,
    #[snafu(display("Top level of config should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Section '{}' should be a map", section))]
    SectionNotMap { section: &'static str },
    #[snafu(display("Value of '{}' should be a string", key))]
    InvalidValue { key: &'static str },
    #[snafu(display("Invalid log level in config"))]
    UnknownLogLevel { source: ParseLogLevelError },
}
