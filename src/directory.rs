//! Materialises a class-indexed directory tree of hard links for image classifiers.
//!
//! The layout matches what directory-based image loaders expect:
//!
//! ```text
//! output_directory/<root>/<class index>/<original file name>
//! output_directory/<root>/class_to_index_map.json
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info, warn};

use crate::chip::{Chip, ChipSource, SetType};
use crate::classes::{attributes_to_classes, ClassIndexMap};
use crate::config::{FailurePolicy, LinkConfig, DEFAULT_MAP_FILENAME};
use crate::error::{ChipError, Result};
use crate::key::KeyFn;
use crate::metrics::LinkMetrics;

/// Root label used when a dataset has no recognised set type.
pub const DEFAULT_ROOT: &str = "all";

/// Hard-links a chip dataset into per-class directories.
///
/// The class map is computed once in [`KerasDirectory::new`]; every later call reuses it.
#[derive(Debug)]
pub struct KerasDirectory<D, K> {
    dataset: D,
    key_fn: K,
    root: String,
    class_to_index: ClassIndexMap,
}

impl<D, K> KerasDirectory<D, K>
where
    D: ChipSource,
    K: KeyFn,
{
    /// Computes the class map for `dataset` and resolves the default root.
    pub fn new(dataset: D, key_fn: K) -> Self {
        let root = resolve_root(dataset.set_type()).to_string();
        let class_to_index = attributes_to_classes(&dataset, &key_fn);
        info!(
            "indexed {} chips into {} classes (root {root:?})",
            dataset.chips().len(),
            class_to_index.len()
        );
        debug!("class map: {:?}", class_to_index.classes());
        Self {
            dataset,
            key_fn,
            root,
            class_to_index,
        }
    }

    /// Root directory chosen from the dataset's set type.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Class map built at construction.
    #[must_use]
    pub fn class_to_index(&self) -> &ClassIndexMap {
        &self.class_to_index
    }

    /// Dataset being materialised.
    #[must_use]
    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    /// Class index of `chip` under this directory's key function.
    pub fn class_index(&self, chip: &Chip) -> Result<usize> {
        self.class_to_index.index_of(&self.key_fn.key(chip))
    }

    /// Writes `output_directory/root/class_index/file_name` hard links for every chip.
    ///
    /// `root` overrides [`KerasDirectory::root`]; pass `Some("")` for no root directory. When
    /// `write_map` is set, the class map is written into the root directory first. The first
    /// failing chip aborts the run.
    pub fn write_links<P: AsRef<Path>>(
        &self,
        output_directory: P,
        root: Option<&str>,
        write_map: bool,
    ) -> Result<LinkMetrics> {
        let cfg = LinkConfig {
            root: root.map(str::to_string),
            write_map,
            ..LinkConfig::default()
        };
        self.write_links_with(output_directory, &cfg)
    }

    /// Writes the link tree as described by `cfg`.
    pub fn write_links_with<P: AsRef<Path>>(
        &self,
        output_directory: P,
        cfg: &LinkConfig,
    ) -> Result<LinkMetrics> {
        cfg.validate()?;
        let start = Instant::now();
        let root_dir = output_directory
            .as_ref()
            .join(cfg.root.as_deref().unwrap_or(&self.root));
        let mut metrics = LinkMetrics::default();

        if cfg.write_map {
            fs::create_dir_all(&root_dir)
                .map_err(|err| ChipError::io(err, Some(root_dir.clone())))?;
            self.write_map(&root_dir, &cfg.map_filename)?;
            metrics.map_written = true;
        }

        for chip in self.dataset.chips() {
            let class_index = self.class_index(chip)?;
            match link_chip(chip, &root_dir, class_index) {
                Ok(dest) => {
                    debug!("linked {} -> {}", chip.filepath.display(), dest.display());
                    metrics.record_link(class_index);
                }
                Err(err) if cfg.failure_policy == FailurePolicy::Skip => {
                    warn!("skipping chip {}: {err}", chip.filepath.display());
                    metrics.record_skip();
                }
                Err(err) => return Err(err),
            }
        }

        metrics.elapsed = start.elapsed();
        info!(
            "linked {} chips into {} ({} skipped) in {:.2?}",
            metrics.linked,
            root_dir.display(),
            metrics.skipped,
            metrics.elapsed
        );
        Ok(metrics)
    }

    /// Writes the class map as pretty JSON to `output_directory/filename`.
    ///
    /// The directory must already exist.
    pub fn write_map<P: AsRef<Path>>(&self, output_directory: P, filename: &str) -> Result<()> {
        let path = output_directory.as_ref().join(filename);
        let json = self.class_to_index.to_json_pretty()?;
        fs::write(&path, json).map_err(|err| ChipError::io(err, Some(path)))
    }

    /// Writes the class map using [`DEFAULT_MAP_FILENAME`].
    pub fn write_default_map<P: AsRef<Path>>(&self, output_directory: P) -> Result<()> {
        self.write_map(output_directory, DEFAULT_MAP_FILENAME)
    }
}

/// Root label for `set_type`, falling back to [`DEFAULT_ROOT`].
#[must_use]
pub fn resolve_root(set_type: Option<SetType>) -> &'static str {
    set_type.map_or(DEFAULT_ROOT, SetType::root_label)
}

fn link_chip(chip: &Chip, root_dir: &Path, class_index: usize) -> Result<PathBuf> {
    let src = chip.path();
    let filename = src.file_name().ok_or_else(|| ChipError::InvalidChip {
        path: src.to_path_buf(),
    })?;
    let dest_dir = root_dir.join(class_index.to_string());
    fs::create_dir_all(&dest_dir).map_err(|err| ChipError::io(err, Some(dest_dir.clone())))?;
    let dest = dest_dir.join(filename);
    fs::hard_link(src, &dest).map_err(|err| {
        let path = if err.kind() == ErrorKind::AlreadyExists {
            dest.clone()
        } else {
            src.to_path_buf()
        };
        ChipError::io(err, Some(path))
    })?;
    Ok(dest)
}
