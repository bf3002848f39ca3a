//! Class-indexed training directories from labeled vehicle chip datasets.
//!
//! The crate exposes both a library API and a `chipclass` command line interface. A chip is a
//! cropped vehicle detection on disk plus free-form metadata; chips sharing the same key
//! (make and model, color, or any field combination) form one training class. Classes are
//! numbered in sorted key order and the source images are hard-linked into
//! `output/<root>/<class index>/`, the layout directory-based image loaders consume.
//!
//! ```no_run
//! use chipclass::{load_manifest, KerasDirectory, KeyKind, ManifestConfig};
//!
//! # fn main() -> chipclass::Result<()> {
//! let dataset = load_manifest("chips.json", &ManifestConfig::default())?;
//! let directory = KerasDirectory::new(dataset, KeyKind::MakeModel);
//! directory.write_links("/data/keras", None, true)?;
//! # Ok(())
//! # }
//! ```
//!
//! The CLI is enabled by default through the `cli` feature.  Users targeting the
//! library portion only can disable default features to avoid the CLI
//! dependencies: `chipclass = { version = "...", default-features = false }`.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    rust_2018_idioms,
    future_incompatible,
    unused_lifetimes,
    unreachable_pub
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown
)]

pub mod chip;
pub mod classes;
pub mod config;
pub mod directory;
pub mod error;
pub mod inspect;
pub mod key;
pub mod manifest;
pub mod metrics;

pub use chip::{Chip, ChipDataset, ChipSource, MetadataSource, NoMetadata, SetType};
pub use classes::{attributes_to_classes, ClassIndexMap};
pub use config::{FailurePolicy, LinkConfig, ManifestConfig, ManifestFormat};
pub use directory::KerasDirectory;
pub use error::{ChipError, Result};
pub use inspect::{inspect_output, OutputSummary};
pub use key::{key_color, key_make_model, key_make_model_color, KeyFn, KeyKind};
pub use manifest::load_manifest;
pub use metrics::LinkMetrics;
