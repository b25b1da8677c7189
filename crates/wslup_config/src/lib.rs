use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = ".wslup.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub distro: String,
    pub components: ComponentsConfig,
    pub python: PythonConfig,
    pub probe: ProbeConfig,
    pub bootstrap: BootstrapConfig,
}

/// Defaults for the optional guest components. Every toggle is still asked
/// interactively unless `--yes` is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentsConfig {
    pub docker: bool,
    pub python: bool,
    pub cuda: bool,
    pub zsh: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PythonConfig {
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Abort when a required step cannot be probed instead of remediating blindly.
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Guest path the bootstrap script is written to.
    pub path: String,
    /// Keep the script in the guest after it ran.
    pub keep: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            distro: "Ubuntu".to_string(),
            components: ComponentsConfig::default(),
            python: PythonConfig::default(),
            probe: ProbeConfig::default(),
            bootstrap: BootstrapConfig::default(),
        }
    }
}

impl Default for ComponentsConfig {
    fn default() -> Self {
        Self {
            docker: true,
            python: true,
            cuda: false,
            zsh: true,
        }
    }
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self {
            version: "3.12".to_string(),
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            path: "/tmp/wslup-bootstrap.sh".to_string(),
            keep: false,
        }
    }
}

/// Distro names end up in `wsl.exe` arguments and PowerShell literals.
pub fn validate_distro_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Invalid("distro must not be empty".into()));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_');
    if !name.chars().all(allowed) {
        return Err(ConfigError::Invalid(format!(
            "distro name '{name}' may only contain letters, digits, '-', '.' and '_'"
        )));
    }
    Ok(())
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `.wslup.toml` from `dir`, falling back to defaults when it does not exist.
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_distro_name(&self.distro)?;
        if !self.bootstrap.path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "bootstrap.path '{}' must be an absolute guest path",
                self.bootstrap.path
            )));
        }
        let version_ok = !self.python.version.is_empty()
            && self
                .python
                .version
                .chars()
                .all(|c| c.is_ascii_digit() || c == '.');
        if !version_ok {
            return Err(ConfigError::Invalid(format!(
                "python.version '{}' is not a version number",
                self.python.version
            )));
        }
        Ok(())
    }
}
