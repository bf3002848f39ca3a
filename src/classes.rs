//! Dense, reproducible class indices derived from chip keys.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::chip::ChipSource;
use crate::error::{ChipError, Result};
use crate::key::KeyFn;

/// Mapping from class key to a dense index in `0..len()`.
///
/// Indices follow ascending key order, so the map only changes when the set of classes does,
/// not when chips are added, removed, or reordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassIndexMap {
    classes: Vec<String>,
    index: FxHashMap<String, usize>,
}

impl ClassIndexMap {
    /// Builds a map from an arbitrary collection of keys; duplicates collapse to one class.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let distinct: FxHashSet<String> = keys.into_iter().map(Into::into).collect();
        let mut classes: Vec<String> = distinct.into_iter().collect();
        classes.sort_unstable();
        let index = classes
            .iter()
            .enumerate()
            .map(|(idx, class)| (class.clone(), idx))
            .collect();
        Self { classes, index }
    }

    /// Index assigned to `key`, if it is a known class.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Index assigned to `key`, failing with [`ChipError::UnknownClass`] otherwise.
    pub fn index_of(&self, key: &str) -> Result<usize> {
        self.get(key)
            .ok_or_else(|| ChipError::UnknownClass(key.to_string()))
    }

    /// Class key stored at `index`.
    #[must_use]
    pub fn class(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    /// Class keys in index order.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no classes were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Iterates `(key, index)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.classes
            .iter()
            .enumerate()
            .map(|(idx, class)| (class.as_str(), idx))
    }

    /// Serialises the map as pretty-printed JSON (two-space indentation).
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a map previously written by [`ClassIndexMap::to_json_pretty`].
    ///
    /// The stored indices must form the dense range `0..N`.
    pub fn from_json(data: &str) -> Result<Self> {
        let raw: FxHashMap<String, usize> = serde_json::from_str(data)?;
        let count = raw.len();
        let mut slots: Vec<Option<String>> = vec![None; count];
        for (class, idx) in raw {
            match slots.get_mut(idx) {
                Some(slot) if slot.is_none() => *slot = Some(class),
                _ => {
                    return Err(ChipError::Serialization(format!(
                        "class {class:?} has index {idx}, which is duplicated or outside 0..{count}"
                    )))
                }
            }
        }
        let classes: Vec<String> = slots.into_iter().flatten().collect();
        let index = classes
            .iter()
            .enumerate()
            .map(|(idx, class)| (class.clone(), idx))
            .collect();
        Ok(Self { classes, index })
    }
}

impl Serialize for ClassIndexMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (class, idx) in self.iter() {
            map.serialize_entry(class, &idx)?;
        }
        map.end()
    }
}

/// Collects the distinct keys `key_fn` produces over `source` and indexes them in sorted order.
pub fn attributes_to_classes<D, K>(source: &D, key_fn: &K) -> ClassIndexMap
where
    D: ChipSource + ?Sized,
    K: KeyFn + ?Sized,
{
    ClassIndexMap::from_keys(source.chips().iter().map(|chip| key_fn.key(chip)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::{Chip, ChipDataset};
    use crate::key::{key_color, key_make_model, KeyKind};
    use serde_json::json;

    fn vehicle(path: &str, make: &str, model: &str, color: &str) -> Chip {
        Chip::new(path).with_misc(json!({"make": make, "model": model, "color": color}))
    }

    fn fleet() -> ChipDataset {
        ChipDataset::new(vec![
            vehicle("a.png", "honda", "civic", "red"),
            vehicle("b.png", "honda", "civic", "blue"),
            vehicle("c.png", "toyota", "camry", "red"),
        ])
    }

    #[test]
    fn scenario_make_model_classes() {
        let classes = attributes_to_classes(&fleet(), &key_make_model);
        assert_eq!(classes.len(), 2);
        assert_eq!(classes.get("honda_civic"), Some(0));
        assert_eq!(classes.get("toyota_camry"), Some(1));
    }

    #[test]
    fn indices_are_dense_and_follow_key_order() {
        let classes = attributes_to_classes(&fleet(), &KeyKind::MakeModelColor);
        let indices: Vec<usize> = classes.iter().map(|(_, idx)| idx).collect();
        assert_eq!(indices, (0..classes.len()).collect::<Vec<_>>());
        for pair in classes.classes().windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(classes.get(&pair[0]) < classes.get(&pair[1]));
        }
    }

    #[test]
    fn class_lookup_inverts_index_lookup() {
        let classes = attributes_to_classes(&fleet(), &KeyKind::MakeModelColor);
        for (class, idx) in classes.iter() {
            assert_eq!(classes.class(idx), Some(class));
            assert_eq!(classes.get(class), Some(idx));
        }
        assert_eq!(classes.class(classes.len()), None);
    }

    #[test]
    fn independent_of_input_order() {
        let forward = fleet();
        let mut reversed = forward.clone();
        reversed.chips.reverse();
        let a = attributes_to_classes(&forward, &key_color);
        let b = attributes_to_classes(&reversed, &key_color);
        assert_eq!(a, b);
        assert_eq!(a, attributes_to_classes(&forward, &key_color));
    }

    #[test]
    fn empty_dataset_yields_empty_map() {
        let classes = attributes_to_classes(&ChipDataset::default(), &key_color);
        assert!(classes.is_empty());
        assert_eq!(classes.to_json_pretty().expect("serialise"), "{}");
    }

    #[test]
    fn unknown_class_is_an_error() {
        let classes = ClassIndexMap::from_keys(["red"]);
        let err = classes.index_of("blue").expect_err("blue was never seen");
        assert!(matches!(err, ChipError::UnknownClass(key) if key == "blue"));
    }

    #[test]
    fn json_uses_two_space_indent_in_index_order() {
        let classes = ClassIndexMap::from_keys(["toyota_camry", "honda_civic"]);
        let json = classes.to_json_pretty().expect("serialise");
        assert_eq!(json, "{\n  \"honda_civic\": 0,\n  \"toyota_camry\": 1\n}");
        let parsed = ClassIndexMap::from_json(&json).expect("parse");
        assert_eq!(parsed, classes);
    }

    #[test]
    fn from_json_rejects_sparse_indices() {
        let err = ClassIndexMap::from_json(r#"{"red": 0, "blue": 2}"#).expect_err("gap at 1");
        assert!(matches!(err, ChipError::Serialization(_)));
    }
}
