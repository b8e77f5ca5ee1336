//! Configuration for pmquest.
//!
//! Settings are read from `<data_dir>/pmquest.toml` and layered as
//! file → environment → CLI:
//!
//! ```toml
//! [navigation]
//! strict = false
//!
//! [gates]
//! reflection_min_chars = 100
//! insights_min_chars = 100
//! insights_min_correct = 4
//!
//! [api]
//! base_url = "http://localhost:3000/api"
//!
//! [user]
//! id = "ada"
//! ```
//!
//! Environment overrides: `PMQUEST_USER`, `PMQUEST_TOKEN`, `PMQUEST_API_URL`.
//! The data directory itself comes from `--data-dir` / `PMQUEST_DATA_DIR`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::catalog::{Catalog, GateDefaults, LevelsFile, builtin_catalog};
use crate::session::LocalIdentity;

pub const CONFIG_FILE: &str = "pmquest.toml";
pub const LEVELS_FILE: &str = "levels.json";
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

/// Default data directory: the platform data dir, or `./.pmquest`.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("pmquest"))
        .unwrap_or_else(|| PathBuf::from(".pmquest"))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigationSection {
    /// Fail on a stored stage the level does not contain, instead of
    /// clamping to the first stage. Defaults to on in debug builds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatesSection {
    #[serde(default = "default_min_chars")]
    pub reflection_min_chars: usize,
    #[serde(default = "default_min_chars")]
    pub insights_min_chars: usize,
    #[serde(default = "default_insights_min_correct")]
    pub insights_min_correct: usize,
}

fn default_min_chars() -> usize {
    100
}

fn default_insights_min_correct() -> usize {
    4
}

impl Default for GatesSection {
    fn default() -> Self {
        Self {
            reflection_min_chars: default_min_chars(),
            insights_min_chars: default_min_chars(),
            insights_min_correct: default_insights_min_correct(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSection {
    /// Signed-in user; absent means guest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Contents of `pmquest.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestToml {
    #[serde(default)]
    pub navigation: NavigationSection,
    #[serde(default)]
    pub gates: GatesSection,
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub user: UserSection,
}

impl QuestToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse pmquest.toml")
    }

    /// Load `pmquest.toml` from the data directory, or defaults if absent.
    pub fn load_or_default(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize pmquest.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn gate_defaults(&self) -> GateDefaults {
        GateDefaults {
            reflection_min_chars: self.gates.reflection_min_chars,
            insights_min_chars: self.gates.insights_min_chars,
            insights_min_correct: self.gates.insights_min_correct,
        }
    }

    pub fn strict(&self) -> bool {
        self.navigation.strict.unwrap_or(cfg!(debug_assertions))
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.gates.insights_min_correct == 0 {
            warnings.push("gates.insights_min_correct is 0: insight selection is not checked".to_string());
        }
        if let Some(url) = &self.api.base_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            warnings.push(format!("api.base_url '{}' is not an http(s) URL", url));
        }
        if let Some(id) = &self.user.id
            && id.trim().is_empty()
        {
            warnings.push("user.id is blank; running as guest".to_string());
        }

        warnings
    }
}

/// Runtime configuration: the file merged with environment overrides.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub toml: QuestToml,
    pub user_id: Option<String>,
    pub api_token: Option<String>,
    pub api_base: String,
}

impl Config {
    /// Load configuration for a data directory using the process environment.
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        Self::with_env(data_dir, |key| std::env::var(key).ok())
    }

    /// Load configuration with an explicit environment lookup.
    pub fn with_env(data_dir: PathBuf, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let toml = QuestToml::load_or_default(&data_dir)?;

        let user_id = env("PMQUEST_USER").or_else(|| toml.user.id.clone());
        let api_base = env("PMQUEST_API_URL")
            .or_else(|| toml.api.base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(Self {
            data_dir,
            user_id,
            api_token: env("PMQUEST_TOKEN"),
            api_base,
            toml,
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    pub fn levels_file(&self) -> PathBuf {
        self.data_dir.join(LEVELS_FILE)
    }

    pub fn strict(&self) -> bool {
        self.toml.strict()
    }

    pub fn gate_defaults(&self) -> GateDefaults {
        self.toml.gate_defaults()
    }

    pub fn identity(&self) -> LocalIdentity {
        LocalIdentity::new(self.user_id.as_deref(), self.api_token.as_deref())
    }

    /// The course catalog: `levels.json` if present, otherwise the built-in
    /// course with the configured gate thresholds.
    pub fn load_catalog(&self) -> Result<Catalog> {
        let levels_file = self.levels_file();
        if levels_file.exists() {
            tracing::debug!(path = %levels_file.display(), "Loading catalog override");
            return LevelsFile::load(&levels_file)?
                .into_catalog()
                .with_context(|| format!("Invalid level catalog: {}", levels_file.display()));
        }
        builtin_catalog(&self.gate_defaults()).context("Built-in catalog is invalid")
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
