//! Metrics describing a link materialisation run.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Outcome counters for [`crate::KerasDirectory::write_links`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkMetrics {
    /// Chips successfully linked.
    pub linked: usize,
    /// Chips skipped under [`crate::FailurePolicy::Skip`].
    pub skipped: usize,
    /// Linked chip count per class index.
    pub per_class: BTreeMap<usize, usize>,
    /// Whether the class map was written.
    pub map_written: bool,
    /// Wall time spent writing.
    pub elapsed: Duration,
}

impl LinkMetrics {
    /// Records a successful link into `class_index`.
    pub fn record_link(&mut self, class_index: usize) {
        self.linked += 1;
        *self.per_class.entry(class_index).or_default() += 1;
    }

    /// Records a chip that could not be linked.
    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// Chips processed, linked or not.
    #[must_use]
    pub fn total(&self) -> usize {
        self.linked + self.skipped
    }
}
