use anyhow::Context;
use roadcore::detection::{parse_feed, FeedEntry, GeoPoint, Severity};
use roadcore::mode::RenderMode;
use roadcore::selection::DismissAction;
use roadcore::viewport::Viewport;
use roadcore::EngineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::generator::profile::{build_feed, GeneratorConfig};
use crate::generator::template::sample_feed;

/// Where the session's detection batch comes from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum FeedSource {
    #[default]
    Sample,
    File {
        path: PathBuf,
    },
    Generated(GeneratorConfig),
}

impl FeedSource {
    pub fn describe(&self) -> String {
        match self {
            FeedSource::Sample => "sample".into(),
            FeedSource::File { path } => format!("file:{}", path.display()),
            FeedSource::Generated(config) => {
                format!("generated:{}@{}", config.count, config.seed)
            }
        }
    }

    pub fn resolve(&self) -> anyhow::Result<Vec<FeedEntry>> {
        match self {
            FeedSource::Sample => sample_feed(),
            FeedSource::File { path } => {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("reading detection feed {}", path.display()))?;
                parse_feed(&contents)
                    .with_context(|| format!("parsing detection feed {}", path.display()))
            }
            FeedSource::Generated(config) => {
                Ok(build_feed(config)?.into_iter().map(FeedEntry::from).collect())
            }
        }
    }
}

/// One scripted operator action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SessionStep {
    Toggle { severity: Severity },
    Mode { mode: RenderMode },
    Select { id: String },
    Close,
    Decide { decision: DismissAction },
    View { lat: f64, lng: f64, zoom: u8 },
    /// Clicks the n-th node of the current marker frame.
    Activate { node: usize },
    ZoomIn,
    ZoomOut,
    Reset,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub feed: FeedSource,
    pub engine: EngineConfig,
    /// Deep-linked starting view applied before any step.
    pub initial_view: Option<Viewport>,
    pub steps: Vec<SessionStep>,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Applies command-line feed overrides. A feed file beats generation.
    pub fn with_overrides(
        mut self,
        feed: Option<PathBuf>,
        generate: Option<usize>,
        seed: u64,
    ) -> Self {
        if let Some(path) = feed {
            self.feed = FeedSource::File { path };
        } else if let Some(count) = generate {
            self.feed = FeedSource::Generated(GeneratorConfig::with_count(count, seed));
        }
        self
    }

    pub fn initial_center(&self) -> Option<(GeoPoint, u8)> {
        self.initial_view.map(|view| (view.center, view.zoom))
    }
}
