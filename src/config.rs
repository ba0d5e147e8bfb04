//! Configuration from `ansisql.toml`.
//!
//! ```toml
//! [compile]
//! use_labels = true
//!
//! [resolve]
//! missing = "null"
//!
//! [output]
//! format = "json"
//! color = false
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::compiler::{CompileOptions, MissingPolicy};
use crate::error::{SqlError, SqlResult};

pub const CONFIG_FILE: &str = "ansisql.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub compile: CompileConfig,
    pub resolve: ResolveConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    pub use_labels: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    pub missing: MissingPolicy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: true,
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> SqlResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Otherwise `./ansisql.toml` is tried,
    /// then the user config directory; if neither exists the defaults apply.
    pub fn load(explicit: Option<&Path>) -> SqlResult<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(SqlError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Self::read(path);
        }

        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return Self::read(&local);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::read(&path),
            _ => {
                debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// `<config dir>/ansisql/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ansisql").join("config.toml"))
    }

    fn read(path: &Path) -> SqlResult<Self> {
        debug!(path = %path.display(), "loading config");
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Compile options seeded from the `[compile]` section.
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            use_labels: self.compile.use_labels,
            ..CompileOptions::default()
        }
    }
}
