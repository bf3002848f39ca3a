//! Chip records, their optional metadata, and the datasets that group them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Token substituted for metadata that is missing or unusable.
pub const MISSING_TOKEN: &str = "None";

/// Read-only access to a chip's descriptive attributes.
pub trait MetadataSource {
    /// Returns the value stored under `key` as a string, or `default` when it is absent.
    fn get(&self, key: &str, default: &str) -> String;

    /// Reports whether `key` is present at all.
    fn contains(&self, key: &str) -> bool;
}

/// Null-object metadata used when a chip carries no mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoMetadata;

impl MetadataSource for NoMetadata {
    fn get(&self, _key: &str, default: &str) -> String {
        default.to_string()
    }

    fn contains(&self, _key: &str) -> bool {
        false
    }
}

impl MetadataSource for Map<String, Value> {
    fn get(&self, key: &str, default: &str) -> String {
        Map::get(self, key).map_or_else(|| default.to_string(), value_token)
    }

    fn contains(&self, key: &str) -> bool {
        self.contains_key(key)
    }
}

/// Coerces a JSON value into the token used inside class keys.
///
/// Strings are used verbatim and `null` becomes [`MISSING_TOKEN`]. Booleans render as
/// `True`/`False` so keys stay compatible with existing class maps; numbers and nested
/// values use their compact JSON text.
#[must_use]
pub fn value_token(value: &Value) -> String {
    match value {
        Value::Null => MISSING_TOKEN.to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// A cropped vehicle detection: an image on disk plus free-form metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chip {
    /// Location of the source image.
    pub filepath: PathBuf,
    /// Arbitrary metadata; only JSON objects are consulted for attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub misc: Option<Value>,
}

impl Chip {
    /// Creates a chip without metadata.
    pub fn new<P: Into<PathBuf>>(filepath: P) -> Self {
        Self {
            filepath: filepath.into(),
            misc: None,
        }
    }

    /// Attaches metadata to the chip.
    #[must_use]
    pub fn with_misc(mut self, misc: Value) -> Self {
        self.misc = Some(misc);
        self
    }

    /// Returns the chip's metadata, or [`NoMetadata`] when `misc` is absent or not an object.
    #[must_use]
    pub fn metadata(&self) -> &dyn MetadataSource {
        match &self.misc {
            Some(Value::Object(map)) => map as &dyn MetadataSource,
            _ => &NoMetadata,
        }
    }

    /// Source image path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.filepath
    }
}

/// Dataset partition a chip collection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetType {
    /// Every chip regardless of partition.
    All,
    /// Query gallery used for re-identification.
    Query,
    /// Held-out evaluation chips.
    Test,
    /// Training chips.
    Train,
}

impl SetType {
    /// Directory label used as the output root for this partition.
    #[must_use]
    pub fn root_label(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Query => "query",
            Self::Test => "test",
            Self::Train => "train",
        }
    }

    /// Parses a partition label case-insensitively, returning `None` for anything unrecognised.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        let name = trimmed
            .strip_prefix("SetType.")
            .unwrap_or(trimmed)
            .to_ascii_lowercase();
        match name.as_str() {
            "all" => Some(Self::All),
            "query" => Some(Self::Query),
            "test" => Some(Self::Test),
            "train" => Some(Self::Train),
            _ => None,
        }
    }
}

impl fmt::Display for SetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.root_label())
    }
}

impl FromStr for SetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| format!("unrecognised set type {s:?}"))
    }
}

/// Anything that can hand out an ordered collection of chips.
pub trait ChipSource {
    /// Chips in iteration order.
    fn chips(&self) -> &[Chip];

    /// Partition of the collection, if known.
    fn set_type(&self) -> Option<SetType> {
        None
    }
}

impl ChipSource for [Chip] {
    fn chips(&self) -> &[Chip] {
        self
    }
}

impl ChipSource for Vec<Chip> {
    fn chips(&self) -> &[Chip] {
        self
    }
}

impl<T: ChipSource + ?Sized> ChipSource for &T {
    fn chips(&self) -> &[Chip] {
        (**self).chips()
    }

    fn set_type(&self) -> Option<SetType> {
        (**self).set_type()
    }
}

/// Ordered chips with an optional partition label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChipDataset {
    /// Partition the chips belong to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_type: Option<SetType>,
    /// Chips in dataset order.
    pub chips: Vec<Chip>,
}

impl ChipDataset {
    /// Creates a dataset without a partition label.
    #[must_use]
    pub fn new(chips: Vec<Chip>) -> Self {
        Self {
            set_type: None,
            chips,
        }
    }

    /// Sets the partition label.
    #[must_use]
    pub fn with_set_type(mut self, set_type: Option<SetType>) -> Self {
        self.set_type = set_type;
        self
    }

    /// Number of chips.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chips.len()
    }

    /// Whether the dataset holds no chips.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }

    /// Iterates chips in dataset order.
    pub fn iter(&self) -> std::slice::Iter<'_, Chip> {
        self.chips.iter()
    }
}

impl ChipSource for ChipDataset {
    fn chips(&self) -> &[Chip] {
        &self.chips
    }

    fn set_type(&self) -> Option<SetType> {
        self.set_type
    }
}

impl<'a> IntoIterator for &'a ChipDataset {
    type Item = &'a Chip;
    type IntoIter = std::slice::Iter<'a, Chip>;

    fn into_iter(self) -> Self::IntoIter {
        self.chips.iter()
    }
}

impl FromIterator<Chip> for ChipDataset {
    fn from_iter<I: IntoIterator<Item = Chip>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metadata_falls_back_to_null_object_for_non_mappings() {
        let chips = [
            Chip::new("a.png"),
            Chip::new("b.png").with_misc(json!(["make", "honda"])),
            Chip::new("c.png").with_misc(json!("honda")),
        ];
        for chip in &chips {
            assert_eq!(chip.metadata().get("make", MISSING_TOKEN), "None");
            assert!(!chip.metadata().contains("make"));
        }
    }

    #[test]
    fn metadata_coerces_values_to_tokens() {
        let chip = Chip::new("a.png").with_misc(json!({
            "make": "honda",
            "year": 2004,
            "rental": false,
            "model": null,
        }));
        let meta = chip.metadata();
        assert_eq!(meta.get("make", MISSING_TOKEN), "honda");
        assert_eq!(meta.get("year", MISSING_TOKEN), "2004");
        assert_eq!(meta.get("rental", MISSING_TOKEN), "False");
        assert_eq!(meta.get("model", MISSING_TOKEN), "None");
        assert!(meta.contains("model"));
        assert_eq!(meta.get("color", "unknown"), "unknown");
    }

    #[test]
    fn set_type_parsing_is_lenient() {
        assert_eq!(SetType::from_label("TRAIN"), Some(SetType::Train));
        assert_eq!(SetType::from_label(" query "), Some(SetType::Query));
        assert_eq!(SetType::from_label("SetType.TEST"), Some(SetType::Test));
        assert_eq!(SetType::from_label("validation"), None);
        assert!("bogus".parse::<SetType>().is_err());
    }

    #[test]
    fn chip_source_forwards_through_references() {
        let dataset =
            ChipDataset::new(vec![Chip::new("a.png")]).with_set_type(Some(SetType::Test));
        let borrowed = &dataset;
        assert_eq!(borrowed.set_type(), Some(SetType::Test));
        assert_eq!(borrowed.chips().len(), 1);
        assert_eq!(dataset.chips.set_type(), None);
    }

    #[test]
    fn dataset_iterates_in_insertion_order() {
        let dataset: ChipDataset = ["b.png", "a.png", "c.png"].into_iter().map(Chip::new).collect();
        let via_iter: Vec<&Path> = dataset.iter().map(Chip::path).collect();
        let mut via_loop = Vec::new();
        for chip in &dataset {
            via_loop.push(chip.path());
        }
        assert_eq!(via_iter, vec![Path::new("b.png"), Path::new("a.png"), Path::new("c.png")]);
        assert_eq!(via_iter, via_loop);
    }
}
