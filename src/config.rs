use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::aggregator::AggregatorConfig;

pub const DEFAULT_INDENT: usize = 4;
pub const DEFAULT_SUBTITLE_SUFFIX: &str = "_subtitles.json";
const MAX_INDENT: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubcueConfig {
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_indent")]
    pub indent: usize,
    #[serde(default = "default_subtitle_suffix")]
    pub subtitle_suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            indent: DEFAULT_INDENT,
            subtitle_suffix: DEFAULT_SUBTITLE_SUFFIX.to_owned(),
        }
    }
}

fn default_indent() -> usize {
    DEFAULT_INDENT
}

fn default_subtitle_suffix() -> String {
    DEFAULT_SUBTITLE_SUFFIX.to_owned()
}

impl SubcueConfig {
    pub fn validate(&self) -> Result<()> {
        if self.output.indent > MAX_INDENT {
            bail!(
                "output.indent must be <= {}, got {}",
                MAX_INDENT,
                self.output.indent
            );
        }

        let suffix = &self.output.subtitle_suffix;
        if !suffix.ends_with(".json") {
            bail!("output.subtitle_suffix must end with '.json', got '{}'", suffix);
        }
        if suffix.contains('/') || suffix.contains('\\') {
            bail!(
                "output.subtitle_suffix must not contain path separators, got '{}'",
                suffix
            );
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<SubcueConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = parse_config(&contents)
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

pub fn parse_config(contents: &str) -> Result<SubcueConfig> {
    // An empty file is a valid config with every default.
    if contents.trim().is_empty() {
        return Ok(SubcueConfig::default());
    }

    let config: SubcueConfig = serde_yaml::from_str(contents).map_err(|error| {
        let location = error
            .location()
            .map(|location| format!("line {}, column {}", location.line(), location.column()))
            .unwrap_or_else(|| "unknown location".to_owned());
        anyhow!("failed to parse yaml at {}: {}", location, error)
    })?;
    config.validate()?;
    Ok(config)
}
