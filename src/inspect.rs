//! Summaries of an already materialised class directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::classes::ClassIndexMap;
use crate::error::{ChipError, Result};

/// File counts for one class directory.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClassSummary {
    /// Class index (directory name).
    pub index: usize,
    /// Class key from the map.
    pub class: String,
    /// Files found under the class directory.
    pub files: usize,
}

/// Result of [`inspect_output`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OutputSummary {
    /// Directory that was inspected.
    pub root: PathBuf,
    /// Every class from the map, in index order.
    pub classes: Vec<ClassSummary>,
    /// Total files across all class directories.
    pub total_files: usize,
    /// Directories whose names are not class indices from the map.
    pub unexpected_dirs: Vec<String>,
}

impl OutputSummary {
    /// Classes with no linked files.
    pub fn empty_classes(&self) -> impl Iterator<Item = &ClassSummary> {
        self.classes.iter().filter(|summary| summary.files == 0)
    }
}

/// Reads the class map at `root/map_filename` and counts the files in each class directory.
pub fn inspect_output<P: AsRef<Path>>(root: P, map_filename: &str) -> Result<OutputSummary> {
    let root = root.as_ref();
    let map_path = root.join(map_filename);
    let data = fs::read_to_string(&map_path)
        .map_err(|err| ChipError::io(err, Some(map_path.clone())))?;
    let class_map = ClassIndexMap::from_json(&data)?;

    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    let mut unexpected_dirs = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|err| ChipError::Internal(err.to_string()))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        match name.parse::<usize>() {
            Ok(index) if index < class_map.len() => {
                counts.insert(index, count_files(entry.path())?);
            }
            _ => unexpected_dirs.push(name),
        }
    }
    unexpected_dirs.sort();

    let classes: Vec<ClassSummary> = class_map
        .iter()
        .map(|(class, index)| ClassSummary {
            index,
            class: class.to_string(),
            files: counts.get(&index).copied().unwrap_or(0),
        })
        .collect();
    let total_files = classes.iter().map(|summary| summary.files).sum();
    Ok(OutputSummary {
        root: root.to_path_buf(),
        classes,
        total_files,
        unexpected_dirs,
    })
}

fn count_files(dir: &Path) -> Result<usize> {
    let mut files = 0;
    for entry in WalkDir::new(dir).min_depth(1) {
        let entry = entry.map_err(|err| ChipError::Internal(err.to_string()))?;
        if entry.file_type().is_file() {
            files += 1;
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAP_FILENAME;
    use tempfile::tempdir;

    #[test]
    fn counts_files_per_class_and_flags_strays() {
        let dir = tempdir().expect("tempdir");
        let root = dir.path();
        let map = ClassIndexMap::from_keys(["blue", "green", "red"]);
        fs::write(root.join(DEFAULT_MAP_FILENAME), map.to_json_pretty().expect("json"))
            .expect("write map");
        fs::create_dir_all(root.join("0")).expect("mkdir");
        fs::create_dir_all(root.join("2")).expect("mkdir");
        fs::create_dir_all(root.join("7")).expect("mkdir");
        fs::create_dir_all(root.join("scratch")).expect("mkdir");
        fs::write(root.join("0/a.png"), b"a").expect("write");
        fs::write(root.join("0/b.png"), b"b").expect("write");
        fs::write(root.join("2/c.png"), b"c").expect("write");

        let summary = inspect_output(root, DEFAULT_MAP_FILENAME).expect("inspect");
        assert_eq!(summary.total_files, 3);
        assert_eq!(summary.classes[0].files, 2);
        assert_eq!(summary.classes[2].class, "red");
        let empty: Vec<&str> = summary
            .empty_classes()
            .map(|summary| summary.class.as_str())
            .collect();
        assert_eq!(empty, vec!["green"]);
        assert_eq!(summary.unexpected_dirs, vec!["7".to_string(), "scratch".to_string()]);
    }

    #[test]
    fn missing_map_is_an_io_error() {
        let dir = tempdir().expect("tempdir");
        let err = inspect_output(dir.path(), DEFAULT_MAP_FILENAME).expect_err("no map");
        assert!(matches!(err, ChipError::Io { .. }));
    }
}
