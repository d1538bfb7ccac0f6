//! Step configuration persisted as YAML.

use std::{
    env,
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    sampler::{DEFAULT_SAMPLING_CAP, SamplingOptions},
    schema::FieldMapping,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepConfig {
    /// Source locator. May contain `${VAR}` references and a `file:` prefix.
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub prefer_big_decimal: bool,
    #[serde(default = "default_sampling_cap")]
    pub sampling_cap: usize,
    #[serde(default)]
    pub fields: Vec<FieldMapping>,
}

fn default_sampling_cap() -> usize {
    DEFAULT_SAMPLING_CAP
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            filename: None,
            prefer_big_decimal: false,
            sampling_cap: DEFAULT_SAMPLING_CAP,
            fields: Vec::new(),
        }
    }
}

impl StepConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening step config {path:?}"))?;
        let reader = BufReader::new(file);
        let config: StepConfig =
            serde_yaml::from_reader(reader).context("Parsing step config YAML")?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("Creating step config {path:?}"))?;
        serde_yaml::to_writer(BufWriter::new(file), self).context("Writing step config YAML")
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing step config to YAML string")
    }

    pub fn sampling_options(&self) -> SamplingOptions {
        SamplingOptions {
            prefer_big_decimal: self.prefer_big_decimal,
            cap: self.sampling_cap,
        }
    }

    /// The configured source path after variable expansion, if any.
    pub fn source_path(&self) -> Option<PathBuf> {
        self.filename.as_deref().and_then(resolve_locator)
    }
}

/// Turns a configured locator into a filesystem path.
///
/// `${NAME}` is replaced by the environment variable `NAME` (unset variables
/// expand to nothing) and a leading `file://` or `file:` is stripped. Returns
/// `None` when nothing is left.
pub fn resolve_locator(raw: &str) -> Option<PathBuf> {
    let expanded = expand_variables(raw.trim());
    let trimmed = expanded.trim();
    let path = trimmed
        .strip_prefix("file://")
        .or_else(|| trimmed.strip_prefix("file:"))
        .unwrap_or(trimmed);
    if path.is_empty() {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

fn expand_variables(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                output.push_str(&env::var(name).unwrap_or_default());
                rest = &after[end + 1..];
            }
            None => {
                output.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    output.push_str(rest);
    output
}
