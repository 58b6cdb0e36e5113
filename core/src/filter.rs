use serde::{Deserialize, Serialize};

use crate::detection::{DetectionRecord, Severity};
use crate::mode::RenderMode;
use crate::store::DetectionStore;

/// Per-severity visibility in marker mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub severe: bool,
    pub moderate: bool,
    pub minor: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            severe: true,
            moderate: true,
            minor: true,
        }
    }
}

impl FilterState {
    pub fn is_visible(&self, severity: Severity) -> bool {
        match severity {
            Severity::Severe => self.severe,
            Severity::Moderate => self.moderate,
            Severity::Minor => self.minor,
        }
    }

    /// Returns a copy with exactly one severity flipped.
    pub fn toggled(mut self, severity: Severity) -> Self {
        let slot = match severity {
            Severity::Severe => &mut self.severe,
            Severity::Moderate => &mut self.moderate,
            Severity::Minor => &mut self.minor,
        };
        *slot = !*slot;
        self
    }
}

/// Records to draw for the given filter and mode. Heatmap mode bypasses the
/// filter entirely and returns the whole batch.
pub fn visible_set<'a>(
    store: &'a DetectionStore,
    filters: &FilterState,
    mode: RenderMode,
) -> Vec<&'a DetectionRecord> {
    match mode {
        RenderMode::Heatmap => store.all().iter().collect(),
        RenderMode::Markers => store
            .all()
            .iter()
            .filter(|record| filters.is_visible(record.severity))
            .collect(),
    }
}
