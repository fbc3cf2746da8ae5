use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::CoreError;
use crate::filter::InclusionFilter;
use crate::rate_limit::{DEFAULT_MAX_CALLS, DEFAULT_PAUSE};

/// Default location of the run config, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/citation_graph.yaml";

const DEFAULT_OUTPUT_DIR: &str = "output";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// On-disk configuration for a citation aggregation run (YAML or TOML).
/// All fields are optional so partial configs can be layered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub seed_paper_ids: Option<Vec<String>>,
    pub only_influential: Option<bool>,
    pub only_include_sections: Option<Vec<String>>,
    pub output_dir: Option<String>,
    pub s2_api_key: Option<String>,
    pub max_calls: Option<u32>,
    pub pause_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
}

/// Supported config syntaxes, picked by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// `.toml` is TOML; anything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// Platform config path: `<config_dir>/citescout/config.toml`.
///
/// Holds per-user defaults such as the API key; the run config overrides it.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("citescout").join("config.toml"))
}

/// Parse config text in the given format.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<ConfigFile, CoreError> {
    match format {
        ConfigFormat::Yaml => {
            // An empty YAML document deserializes as null, not as an empty map.
            if content.trim().is_empty() {
                return Ok(ConfigFile::default());
            }
            serde_yaml::from_str(content).map_err(|e| CoreError::Config(e.to_string()))
        }
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| CoreError::Config(e.to_string())),
    }
}

/// Load and parse a config file.
pub fn load_from_path(path: &Path) -> Result<ConfigFile, CoreError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))?;
    parse_config(&content, ConfigFormat::from_path(path)).map_err(|e| match e {
        CoreError::Config(msg) => CoreError::Config(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

/// Load the run config at `path`, layered over the platform config if one
/// exists and parses. Run config values win.
pub fn load_config(path: &Path) -> Result<ConfigFile, CoreError> {
    let run = load_from_path(path)?;
    let platform = config_path().and_then(|p| load_from_path(&p).ok());
    Ok(match platform {
        Some(base) => merge(base, run),
        None => run,
    })
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        seed_paper_ids: overlay.seed_paper_ids.or(base.seed_paper_ids),
        only_influential: overlay.only_influential.or(base.only_influential),
        only_include_sections: overlay.only_include_sections.or(base.only_include_sections),
        output_dir: overlay.output_dir.or(base.output_dir),
        s2_api_key: overlay.s2_api_key.or(base.s2_api_key),
        max_calls: overlay.max_calls.or(base.max_calls),
        pause_secs: overlay.pause_secs.or(base.pause_secs),
        timeout_secs: overlay.timeout_secs.or(base.timeout_secs),
    }
}

/// Fully resolved settings for one aggregation run.
#[derive(Clone)]
pub struct AggregatorConfig {
    pub seed_paper_ids: Vec<String>,
    pub filter: InclusionFilter,
    pub output_dir: PathBuf,
    pub s2_api_key: Option<String>,
    pub max_calls: u32,
    pub pause: Duration,
    pub timeout: Duration,
}

impl std::fmt::Debug for AggregatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregatorConfig")
            .field("seed_paper_ids", &self.seed_paper_ids)
            .field("filter", &self.filter)
            .field("output_dir", &self.output_dir)
            .field("s2_api_key", &self.s2_api_key.as_ref().map(|_| "***"))
            .field("max_calls", &self.max_calls)
            .field("pause", &self.pause)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl AggregatorConfig {
    /// Apply defaults. `seed_paper_ids` has no default and must be present.
    pub fn resolve(file: ConfigFile) -> Result<Self, CoreError> {
        let seed_paper_ids = file
            .seed_paper_ids
            .ok_or_else(|| CoreError::Config("missing `seed_paper_ids`".into()))?;

        Ok(Self {
            seed_paper_ids,
            filter: InclusionFilter::new(
                file.only_influential.unwrap_or(false),
                file.only_include_sections.unwrap_or_default(),
            ),
            output_dir: PathBuf::from(file.output_dir.unwrap_or_else(|| DEFAULT_OUTPUT_DIR.into())),
            s2_api_key: file.s2_api_key.filter(|k| !k.trim().is_empty()),
            max_calls: file.max_calls.unwrap_or(DEFAULT_MAX_CALLS),
            pause: file
                .pause_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_PAUSE),
            timeout: Duration::from_secs(file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        })
    }
}
