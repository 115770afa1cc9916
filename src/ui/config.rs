use crate::debugger::Error;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// Allowed number of lines per view.
pub const LINES_RANGE: RangeInclusive<u32> = 5..=50;

/// Persisted user interface options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UiConfig {
    /// Memory dump and disassembly lines.
    pub lines: u32,
    /// Show code/memory from PC each time the target stops.
    pub follow_pc: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            lines: 12,
            follow_pc: true,
        }
    }
}

#[derive(Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    general: UiConfig,
}

impl UiConfig {
    const DEFAULT_PATH: &'static str = ".config/rdbctl/config.toml";

    /// Return path of the configuration file in user home directory.
    pub fn default_path() -> Option<PathBuf> {
        home::home_dir().map(|home| home.join(Self::DEFAULT_PATH))
    }

    /// Load configuration, fall back to defaults if file doesn't exist or is malformed.
    /// A malformed file is reported once.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(Some(config)) => config,
            Ok(None) => {
                log::debug!(target: "config", "{path:?} not found, use defaults");
                Self::default()
            }
            Err(e) => {
                log::error!(target: "config", "{e}");
                Self::default()
            }
        }
    }

    /// Load configuration. Return `Ok(None)` if file doesn't exist.
    pub fn try_load(path: &Path) -> Result<Option<Self>, Error> {
        let mismatch = |reason: String| Error::ConfigMismatch {
            path: path.to_path_buf(),
            reason,
        };

        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(mismatch(e.to_string())),
        };

        let file: ConfigFile =
            toml::from_str(&data).map_err(|e| mismatch(e.message().to_string()))?;
        let config = file.general;
        if !LINES_RANGE.contains(&config.lines) {
            return Err(mismatch(format!(
                "lines must be in {}..={}, got {}",
                LINES_RANGE.start(),
                LINES_RANGE.end(),
                config.lines
            )));
        }

        Ok(Some(config))
    }

    /// Save configuration, parent directories are created if needed.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let data = toml::to_string(&ConfigFile { general: *self })?;
        fs::write(path, data)?;
        log::debug!(target: "config", "configuration saved into {path:?}");
        Ok(())
    }
}
