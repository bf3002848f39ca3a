//! Facilities for loading chip datasets from JSON and JSON Lines manifests.
//!
//! A JSON manifest is either a bare array of chips or an object carrying the chips and an
//! optional set type:
//!
//! ```json
//! {"set_type": "train", "chips": [{"filepath": "img/0001.png", "misc": {"make": "honda"}}]}
//! ```
//!
//! JSON Lines manifests hold one chip object per line and never declare a set type; use
//! [`ManifestConfig::set_type`] to assign one.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::chip::{Chip, ChipDataset, SetType};
use crate::config::{ManifestConfig, ManifestFormat};
use crate::error::{ChipError, Result};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawManifest {
    Chips(Vec<Chip>),
    Dataset {
        #[serde(default)]
        set_type: Option<Value>,
        chips: Vec<Chip>,
    },
}

/// Loads a chip dataset from `path` according to `cfg`.
pub fn load_manifest<P: AsRef<Path>>(path: P, cfg: &ManifestConfig) -> Result<ChipDataset> {
    let path = path.as_ref();
    let data =
        fs::read_to_string(path).map_err(|err| ChipError::io(err, Some(path.to_path_buf())))?;
    let mut dataset = match cfg.format.resolve(path) {
        ManifestFormat::JsonLines => parse_json_lines(&data, path)?,
        _ => parse_json(&data, path)?,
    };
    if cfg.set_type.is_some() {
        dataset.set_type = cfg.set_type;
    }
    if cfg.resolve_relative {
        if let Some(base) = path.parent() {
            resolve_paths(&mut dataset.chips, base);
        }
    }
    info!(
        "loaded {} chips from {} (set type {})",
        dataset.len(),
        path.display(),
        dataset
            .set_type
            .map_or_else(|| "unset".to_string(), |set_type| set_type.to_string())
    );
    Ok(dataset)
}

/// Parses a JSON manifest document.
pub fn parse_json(data: &str, path: &Path) -> Result<ChipDataset> {
    let raw: RawManifest = serde_json::from_str(data).map_err(|err| ChipError::Manifest {
        path: path.to_path_buf(),
        line: Some(err.line()),
        message: err.to_string(),
    })?;
    Ok(match raw {
        RawManifest::Chips(chips) => ChipDataset::new(chips),
        RawManifest::Dataset { set_type, chips } => {
            ChipDataset::new(chips).with_set_type(parse_set_type(set_type.as_ref(), path))
        }
    })
}

/// Parses a JSON Lines manifest; blank lines are ignored.
pub fn parse_json_lines(data: &str, path: &Path) -> Result<ChipDataset> {
    let mut chips = Vec::new();
    for (idx, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let chip: Chip = serde_json::from_str(line).map_err(|err| ChipError::Manifest {
            path: path.to_path_buf(),
            line: Some(idx + 1),
            message: err.to_string(),
        })?;
        chips.push(chip);
    }
    Ok(ChipDataset::new(chips))
}

fn parse_set_type(value: Option<&Value>, path: &Path) -> Option<SetType> {
    let value = value?;
    let parsed = value.as_str().and_then(SetType::from_label);
    if parsed.is_none() && !value.is_null() {
        warn!(
            "manifest {} declares unrecognised set_type {value}; using the default root",
            path.display()
        );
    }
    parsed
}

fn resolve_paths(chips: &mut [Chip], base: &Path) {
    for chip in chips {
        if chip.filepath.is_relative() {
            chip.filepath = join_base(base, &chip.filepath);
        }
    }
}

fn join_base(base: &Path, relative: &Path) -> PathBuf {
    if base.as_os_str().is_empty() {
        relative.to_path_buf()
    } else {
        base.join(relative)
    }
}
