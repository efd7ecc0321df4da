use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::e_command_builder::Network;
use crate::e_error::{Error, Result};
use crate::e_patterns::{PatternSpec, PatternTable};

/// Name of the optional per-project settings file, looked up next to `Move.toml`.
pub const CONFIG_FILE: &str = "move-e.toml";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Settings as read from `move-e.toml`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub aptos: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub profile: Option<String>,
    pub network: Option<String>,
    pub color: Option<bool>,
    pub assume_yes: Option<bool>,
    #[serde(default)]
    pub patterns: Vec<PatternSpec>,
}

impl ConfigFile {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::parse(&text)
    }

    /// Loads `move-e.toml` from `dir` if it exists.
    pub fn discover(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE);
        if path.is_file() {
            log::debug!("loading {}", path.display());
            Self::load(&path).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Values given on the command line; they win over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub aptos: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub profile: Option<String>,
    pub network: Option<String>,
    pub no_color: bool,
    pub assume_yes: bool,
}

/// Fully resolved, immutable settings handed to each component at construction.
#[derive(Debug, Clone)]
pub struct Config {
    pub aptos: PathBuf,
    pub timeout: Duration,
    pub profile: String,
    pub network: Option<Network>,
    pub color: bool,
    /// Answer aptos confirmation prompts with yes; stdin is never a terminal.
    pub assume_yes: bool,
    pub patterns: PatternTable,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            aptos: PathBuf::from("aptos"),
            timeout: DEFAULT_TIMEOUT,
            profile: "default".to_string(),
            network: None,
            color: cfg!(feature = "color"),
            assume_yes: false,
            patterns: PatternTable::default_move(),
        }
    }
}

impl Config {
    /// Layers defaults, then `file`, then `overrides`.
    pub fn resolve(file: Option<ConfigFile>, overrides: ConfigOverrides) -> Result<Self> {
        let defaults = Config::default();
        let file = file.unwrap_or_default();

        let timeout_secs = overrides.timeout_secs.or(file.timeout_secs);
        if timeout_secs == Some(0) {
            return Err(Error::Config("timeout must be at least one second".into()));
        }
        let network = match overrides.network.or(file.network) {
            Some(name) => Some(name.parse::<Network>()?),
            None => None,
        };
        let patterns = if file.patterns.is_empty() {
            defaults.patterns
        } else {
            PatternTable::with_extra(&file.patterns)?
        };

        Ok(Config {
            aptos: overrides.aptos.or(file.aptos).unwrap_or(defaults.aptos),
            timeout: timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            profile: overrides.profile.or(file.profile).unwrap_or(defaults.profile),
            network,
            color: !overrides.no_color && file.color.unwrap_or(defaults.color),
            assume_yes: overrides.assume_yes || file.assume_yes.unwrap_or(defaults.assume_yes),
            patterns,
        })
    }
}
