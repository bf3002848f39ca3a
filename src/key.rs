//! Class key derivation from chip metadata.
//!
//! Every function here is total: missing or malformed metadata degrades to the literal
//! [`MISSING_TOKEN`] instead of failing, so every chip always receives a class label.
//! [`check_metadata`] offers an opt-in strict pass for callers that would rather reject such
//! chips up front.

use std::fmt;

use crate::chip::{Chip, ChipSource, MISSING_TOKEN};
use crate::error::{ChipError, Result};

/// Separator placed between tokens of a class key.
pub const KEY_SEPARATOR: &str = "_";

/// Anything that maps a chip to its class key.
pub trait KeyFn {
    /// Returns the class key for `chip`.
    fn key(&self, chip: &Chip) -> String;
}

impl<F> KeyFn for F
where
    F: Fn(&Chip) -> String,
{
    fn key(&self, chip: &Chip) -> String {
        self(chip)
    }
}

/// Joins tokens with [`KEY_SEPARATOR`].
pub fn join_tokens<I, T>(tokens: I) -> String
where
    I: IntoIterator<Item = T>,
    T: fmt::Display,
{
    tokens
        .into_iter()
        .map(|token| token.to_string())
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

/// Builds a key from the listed metadata fields, in order.
pub fn key_fields<S: AsRef<str>>(chip: &Chip, fields: &[S]) -> String {
    let metadata = chip.metadata();
    join_tokens(
        fields
            .iter()
            .map(|field| metadata.get(field.as_ref(), MISSING_TOKEN)),
    )
}

/// Returns `"<make>_<model>"`, e.g. `honda_civic` or `None_None`.
pub fn key_make_model(chip: &Chip) -> String {
    key_fields(chip, &["make", "model"])
}

/// Returns the chip's color, or `None`.
pub fn key_color(chip: &Chip) -> String {
    key_fields(chip, &["color"])
}

/// Returns `"<make>_<model>_<color>"`.
pub fn key_make_model_color(chip: &Chip) -> String {
    join_tokens([key_make_model(chip), key_color(chip)])
}

/// Named key functions selectable from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyKind {
    /// `make_model`.
    MakeModel,
    /// `color`.
    Color,
    /// `make_model_color`.
    MakeModelColor,
    /// Arbitrary ordered metadata fields.
    Fields(Vec<String>),
}

impl KeyKind {
    /// Metadata fields consulted by this key, in key order.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::MakeModel => vec!["make", "model"],
            Self::Color => vec!["color"],
            Self::MakeModelColor => vec!["make", "model", "color"],
            Self::Fields(fields) => fields.iter().map(String::as_str).collect(),
        }
    }
}

impl KeyFn for KeyKind {
    fn key(&self, chip: &Chip) -> String {
        match self {
            Self::MakeModel => key_make_model(chip),
            Self::Color => key_color(chip),
            Self::MakeModelColor => key_make_model_color(chip),
            Self::Fields(fields) => key_fields(chip, fields),
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MakeModel => f.write_str("make_model"),
            Self::Color => f.write_str("color"),
            Self::MakeModelColor => f.write_str("make_model_color"),
            Self::Fields(fields) => f.write_str(&fields.join(KEY_SEPARATOR)),
        }
    }
}

/// Verifies every chip carries each of `fields`, failing on the first that does not.
///
/// Fields that are present but `null` count as present; their key token is still `None`.
pub fn check_metadata<D, S>(source: &D, fields: &[S]) -> Result<()>
where
    D: ChipSource + ?Sized,
    S: AsRef<str>,
{
    let fields: Vec<&str> = fields.iter().map(AsRef::as_ref).collect();
    for chip in source.chips() {
        let metadata = chip.metadata();
        if let Some(field) = fields.iter().find(|field| !metadata.contains(field)) {
            return Err(ChipError::MissingMetadata {
                path: chip.filepath.clone(),
                field: (*field).to_string(),
            });
        }
    }
    Ok(())
}
