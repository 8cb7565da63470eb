use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::environment::{ASSERT, EXPORTS};
use crate::error::CheckError;
use crate::lint::LintConfig;

pub const CONFIG_FILE: &str = "doccheck.toml";

/// Per-directory settings read from `doccheck.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Wall-clock budget for each prolog or block execution.
    pub timeout_ms: u64,
    /// How the value after `// =>` is separated from trailing commentary.
    pub arrow_values: ValueStrategy,
    pub lint: LintSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueStrategy {
    /// Parse the value and cut back at `:`/`;` until it parses.
    #[default]
    Parse,
    /// Cut at the first `;`, else at the first `:` outside of braces.
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LintSettings {
    pub enabled: bool,
    /// Extra read-only names samples may reference without defining.
    pub globals: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timeout_ms: crate::host::DEFAULT_TIMEOUT.as_millis() as u64,
            arrow_values: ValueStrategy::default(),
            lint: LintSettings::default(),
        }
    }
}

impl Default for LintSettings {
    fn default() -> Self {
        LintSettings {
            enabled: true,
            globals: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Find the config governing `dir`: the nearest `doccheck.toml` in `dir`
    /// or one of its ancestors. Defaults apply when there is none.
    pub fn resolve(dir: &Path) -> Result<Self, CheckError> {
        match find_config(dir) {
            Some(path) => Self::load(&path),
            None => Ok(Config::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self, CheckError> {
        let text = std::fs::read_to_string(path).map_err(|source| CheckError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Self::from_toml(&text).map_err(|source| CheckError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Lint configuration with the injected prelude names declared. `assert`
    /// is read-only; `exports` may be assigned to.
    pub fn lint_config(&self) -> LintConfig {
        let mut config = LintConfig::default();
        config.readonly.insert(ASSERT.to_string());
        config.writable.insert(EXPORTS.to_string());
        config.readonly.extend(self.lint.globals.iter().cloned());
        config
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(timeout) = overrides.timeout {
            self.timeout_ms = timeout.as_millis() as u64;
        }
        if let Some(lint) = overrides.lint {
            self.lint.enabled = lint;
        }
    }
}

/// Command-line settings that win over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub timeout: Option<Duration>,
    pub lint: Option<bool>,
}

fn find_config(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .map(|d| d.join(CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}
