//! Configuration builders controlling link materialisation and manifest loading.

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::chip::SetType;
use crate::error::{ChipError, Result};

/// Default file name for the persisted class map.
pub const DEFAULT_MAP_FILENAME: &str = "class_to_index_map.json";

/// What to do when linking a single chip fails.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failure and return it.
    #[default]
    Abort,
    /// Log the failure, count it, and continue with the next chip.
    Skip,
}

/// Configuration for writing a class-indexed link tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkConfig {
    /// Root directory under the output directory; `None` uses the dataset's set type and
    /// `Some("")` writes classes directly into the output directory.
    pub root: Option<String>,
    /// Writes the class map JSON before linking.
    pub write_map: bool,
    /// File name for the class map.
    pub map_filename: String,
    /// Behaviour when a chip cannot be linked.
    pub failure_policy: FailurePolicy,
}

impl LinkConfig {
    /// Returns a builder initialised with [`LinkConfig::default`].
    #[must_use]
    pub fn builder() -> LinkBuilder {
        LinkBuilder::default()
    }

    /// Validates that the root and map file name stay inside the output directory.
    pub fn validate(&self) -> Result<()> {
        if let Some(root) = &self.root {
            if Path::new(root).components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::RootDir | Component::Prefix(_)
                )
            }) {
                return Err(ChipError::InvalidConfig(format!(
                    "root {root:?} must be a relative path without '..' components"
                )));
            }
        }
        if self.map_filename.is_empty() {
            return Err(ChipError::InvalidConfig(
                "map_filename must not be empty".into(),
            ));
        }
        let mut components = Path::new(&self.map_filename).components();
        if !matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) {
            return Err(ChipError::InvalidConfig(format!(
                "map_filename {:?} must be a plain file name",
                self.map_filename
            )));
        }
        Ok(())
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            root: None,
            write_map: true,
            map_filename: DEFAULT_MAP_FILENAME.to_string(),
            failure_policy: FailurePolicy::Abort,
        }
    }
}

/// Builder for [`LinkConfig`].
#[derive(Debug, Default, Clone)]
pub struct LinkBuilder {
    cfg: LinkConfig,
}

impl LinkBuilder {
    /// Creates a builder with [`LinkConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the root directory (`""` for none).
    #[must_use]
    pub fn root<S: Into<String>>(mut self, root: S) -> Self {
        self.cfg.root = Some(root.into());
        self
    }

    /// Enables or disables writing the class map.
    #[must_use]
    pub fn write_map(mut self, enabled: bool) -> Self {
        self.cfg.write_map = enabled;
        self
    }

    /// Sets the class map file name.
    #[must_use]
    pub fn map_filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.cfg.map_filename = filename.into();
        self
    }

    /// Sets the per-chip failure policy.
    #[must_use]
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.cfg.failure_policy = policy;
        self
    }

    /// Finalises the builder, returning a validated [`LinkConfig`].
    pub fn build(self) -> Result<LinkConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

/// On-disk layout of a chip manifest.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ManifestFormat {
    /// Guess from the file extension.
    #[default]
    Auto,
    /// A single JSON document.
    Json,
    /// One chip object per line.
    JsonLines,
}

impl ManifestFormat {
    /// Resolves [`ManifestFormat::Auto`] using the extension of `path`.
    #[must_use]
    pub fn resolve(self, path: &Path) -> Self {
        match self {
            Self::Auto => match path.extension().and_then(|ext| ext.to_str()) {
                Some(ext)
                    if ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("ndjson") =>
                {
                    Self::JsonLines
                }
                _ => Self::Json,
            },
            explicit => explicit,
        }
    }
}

/// Configuration controlling how chip manifests are read from disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestConfig {
    /// Manifest layout.
    pub format: ManifestFormat,
    /// Replaces the set type declared by the manifest.
    pub set_type: Option<SetType>,
    /// Resolves relative chip paths against the manifest's directory.
    pub resolve_relative: bool,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            format: ManifestFormat::Auto,
            set_type: None,
            resolve_relative: true,
        }
    }
}

impl ManifestConfig {
    /// Returns a builder initialised with [`ManifestConfig::default`].
    #[must_use]
    pub fn builder() -> ManifestBuilder {
        ManifestBuilder::default()
    }
}

/// Builder for [`ManifestConfig`].
#[derive(Debug, Default, Clone)]
pub struct ManifestBuilder {
    cfg: ManifestConfig,
}

impl ManifestBuilder {
    /// Creates a new builder with [`ManifestConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the manifest format.
    #[must_use]
    pub fn format(mut self, format: ManifestFormat) -> Self {
        self.cfg.format = format;
        self
    }

    /// Forces the dataset's set type.
    #[must_use]
    pub fn set_type(mut self, set_type: Option<SetType>) -> Self {
        self.cfg.set_type = set_type;
        self
    }

    /// Enables or disables resolving relative chip paths.
    #[must_use]
    pub fn resolve_relative(mut self, enabled: bool) -> Self {
        self.cfg.resolve_relative = enabled;
        self
    }

    /// Finalises the builder, returning the [`ManifestConfig`].
    pub fn build(self) -> ManifestConfig {
        self.cfg
    }
}
