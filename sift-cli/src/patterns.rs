//! Pattern and configuration file loading
//!
//! Pattern files come in two shapes: a `.json` document of the form
//! `{"patterns": [{"id": 1, "pattern": "he"}]}`, or plain text with one
//! pattern per line, where the 1-based line number is the pattern id and
//! blank lines are skipped.

use anyhow::{Context, Result};
use serde::Deserialize;
use sift_ac::{AcConfig, PatternSet};
use std::path::Path;

#[derive(Debug, Deserialize)]
struct PatternFile {
    patterns: Vec<PatternEntry>,
}

#[derive(Debug, Deserialize)]
struct PatternEntry {
    id: u32,
    pattern: String,
}

/// Load a pattern file, choosing the format by extension
pub fn load_patterns(path: &Path) -> Result<PatternSet> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read pattern file {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let set = if is_json {
        parse_json(&bytes)
    } else {
        parse_lines(&bytes)
    }
    .with_context(|| format!("Invalid pattern file {}", path.display()))?;

    tracing::debug!(path = %path.display(), patterns = set.len(), "Loaded patterns");
    Ok(set)
}

/// Parse the JSON pattern format
pub fn parse_json(bytes: &[u8]) -> Result<PatternSet> {
    let file: PatternFile = serde_json::from_slice(bytes).context("Malformed JSON pattern file")?;

    let mut set = PatternSet::new();
    for entry in file.patterns {
        set.insert(entry.id, entry.pattern)
            .with_context(|| format!("Pattern {}", entry.id))?;
    }
    Ok(set)
}

/// Parse the line-per-pattern format
pub fn parse_lines(bytes: &[u8]) -> Result<PatternSet> {
    let mut set = PatternSet::new();

    for (idx, line) in bytes.split(|&b| b == b'\n').enumerate() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            continue;
        }

        let id = u32::try_from(idx + 1).context("Too many lines in pattern file")?;
        set.insert(id, line)
            .with_context(|| format!("Line {}", idx + 1))?;
    }

    Ok(set)
}

/// Load an optional JSON configuration file; missing fields keep defaults
pub fn load_config(path: Option<&Path>) -> Result<AcConfig> {
    let Some(path) = path else {
        return Ok(AcConfig::default());
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = serde_json::from_str(&text)
        .with_context(|| format!("Invalid config file {}", path.display()))?;

    Ok(config)
}
