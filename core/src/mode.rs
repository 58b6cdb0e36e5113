use serde::{Deserialize, Serialize};

/// How the visible set is drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Markers,
    Heatmap,
}

impl RenderMode {
    pub fn toggled(self) -> Self {
        match self {
            RenderMode::Markers => RenderMode::Heatmap,
            RenderMode::Heatmap => RenderMode::Markers,
        }
    }

    /// Severity filters only apply while markers are drawn.
    pub fn filters_enabled(self) -> bool {
        self == RenderMode::Markers
    }
}

/// Holds the current render mode. Changing it touches nothing else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeSelector {
    mode: RenderMode,
}

impl ModeSelector {
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Returns whether the mode changed.
    pub fn set_mode(&mut self, mode: RenderMode) -> bool {
        let changed = self.mode != mode;
        self.mode = mode;
        changed
    }
}
