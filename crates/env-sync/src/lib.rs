//! Sync load settings from a `.env` file into a YAML metadata file.
//!
//! Only known keys are rewritten, line by line, so comments and unrelated
//! keys in the YAML file stay untouched.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Metadata file not found: {}", .0.display())]
    MetadataNotFound(PathBuf),

    #[error("Expected integer for value '{0}'")]
    InvalidInteger(String),

    #[error("Expected boolean-style value for '{0}' (true/false, yes/no, 1/0)")]
    InvalidBool(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// How an env value is rendered into YAML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formatter {
    /// `"value"`
    Quoted,
    /// value as-is
    Raw,
    Int,
    Bool,
}

impl Formatter {
    pub fn format(self, value: &str) -> Result<String, SyncError> {
        match self {
            Formatter::Quoted => Ok(format!("\"{}\"", value)),
            Formatter::Raw => Ok(value.to_string()),
            Formatter::Int => value
                .parse::<i64>()
                .map(|n| n.to_string())
                .map_err(|_| SyncError::InvalidInteger(value.to_string())),
            Formatter::Bool => match value.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok("true".to_string()),
                "false" | "0" | "no" | "off" => Ok("false".to_string()),
                _ => Err(SyncError::InvalidBool(value.to_string())),
            },
        }
    }
}

/// A known env key and the YAML key it updates.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    pub env_key: &'static str,
    pub yaml_key: &'static str,
    pub formatter: Formatter,
}

pub const FIELD_MAPPINGS: [FieldMapping; 8] = [
    FieldMapping {
        env_key: "ENABLE_LOAD",
        yaml_key: "enableLoad",
        formatter: Formatter::Bool,
    },
    FieldMapping {
        env_key: "BASELINE_PAUSE",
        yaml_key: "baselinePause",
        formatter: Formatter::Raw,
    },
    FieldMapping {
        env_key: "LOAD_PAUSE",
        yaml_key: "loadPause",
        formatter: Formatter::Raw,
    },
    FieldMapping {
        env_key: "LOAD_REPLICAS",
        yaml_key: "loadGeneratorReplicas",
        formatter: Formatter::Int,
    },
    FieldMapping {
        env_key: "LOAD_BASE_RPS",
        yaml_key: "loadGeneratorBaseRps",
        formatter: Formatter::Quoted,
    },
    FieldMapping {
        env_key: "LOAD_RAMP_FACTOR",
        yaml_key: "loadGeneratorRampFactor",
        formatter: Formatter::Quoted,
    },
    FieldMapping {
        env_key: "LOAD_RAMP_INTERVAL_SECONDS",
        yaml_key: "loadGeneratorRampIntervalSeconds",
        formatter: Formatter::Quoted,
    },
    FieldMapping {
        env_key: "LOAD_RUN_DURATION_SECONDS",
        yaml_key: "loadGeneratorRunDurationSeconds",
        formatter: Formatter::Quoted,
    },
];

/// Parse `.env` content.
///
/// Blank lines, `#` comments and lines without `=` are skipped. Values
/// lose surrounding whitespace and quotes.
pub fn parse_env(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

/// Read a `.env` file; a missing file yields no values.
pub fn load_env(path: &Path) -> Result<BTreeMap<String, String>, SyncError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(parse_env(&content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e.into()),
    }
}

/// Formatted YAML values for every mapped key present in `env`.
pub fn collect_updates(
    env: &BTreeMap<String, String>,
) -> Result<BTreeMap<&'static str, String>, SyncError> {
    let mut updates = BTreeMap::new();
    for mapping in FIELD_MAPPINGS.iter() {
        if let Some(value) = env.get(mapping.env_key) {
            updates.insert(mapping.yaml_key, mapping.formatter.format(value)?);
        }
    }
    Ok(updates)
}

/// Rewrite matching `key: value` lines, keeping their indentation.
///
/// Returns the new content (newline terminated) and the keys rewritten, in
/// file order.
pub fn patch_lines(content: &str, updates: &BTreeMap<&'static str, String>) -> (String, Vec<String>) {
    let mut updated_keys = Vec::new();
    let mut lines: Vec<String> = Vec::new();

    for line in content.lines() {
        let Some((left, _)) = line.split_once(':') else {
            lines.push(line.to_string());
            continue;
        };

        let key = left.trim();
        match updates.get(key) {
            Some(value) => {
                let indent = &left[..left.len() - left.trim_start().len()];
                lines.push(format!("{}{}: {}", indent, key, value));
                updated_keys.push(key.to_string());
            }
            None => lines.push(line.to_string()),
        }
    }

    let mut patched = lines.join("\n");
    patched.push('\n');
    (patched, updated_keys)
}

/// Apply `env` to the metadata file in place.
///
/// The file is only rewritten when at least one mapped key is present.
pub fn sync_metadata(
    metadata_path: &Path,
    env: &BTreeMap<String, String>,
) -> Result<Vec<String>, SyncError> {
    if !metadata_path.exists() {
        return Err(SyncError::MetadataNotFound(metadata_path.to_path_buf()));
    }

    let content = std::fs::read_to_string(metadata_path)?;
    let updates = collect_updates(env)?;
    if updates.is_empty() {
        return Ok(Vec::new());
    }

    let (patched, updated_keys) = patch_lines(&content, &updates);
    std::fs::write(metadata_path, patched)?;
    Ok(updated_keys)
}
