use serde::Serialize;
use std::time::Duration;

use crate::detection::{DetectionRecord, FeedEntry, GeoPoint, Severity};
use crate::filter::{visible_set, FilterState};
use crate::layers::{heatmap_points, ClusterLayer, ClusterNode, HeatGrid, HeatPoint, HeatmapLayer};
use crate::mode::{ModeSelector, RenderMode};
use crate::notify::Notifier;
use crate::prelude::{EngineConfig, MapLayer, PanelResult, ViewportError};
use crate::selection::{CloseReason, DetailView, DismissAction, PanelTransition, SelectionPanel};
use crate::store::{DetectionStore, LoadReport};
use crate::telemetry::{LogManager, MetricsRecorder, MetricsSnapshot};
use crate::viewport::{Viewport, ViewportController};

/// Result of clicking a marker-mode node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Selected(PanelTransition),
    Expanded { zoom: u8, changed: bool },
}

/// Everything a presentation layer needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapFrame {
    pub mode: RenderMode,
    pub filters: FilterState,
    pub viewport: Viewport,
    pub visible_count: usize,
    pub total_count: usize,
    pub nodes: Vec<ClusterNode>,
    pub heat_points: Vec<HeatPoint>,
    pub detail: Option<DetailView>,
}

/// Detection display engine for one map view.
///
/// Owns all view state explicitly; the notification sink is injected so the
/// engine never reaches for anything global.
pub struct MapEngine<N: Notifier> {
    config: EngineConfig,
    store: DetectionStore,
    filters: FilterState,
    mode: ModeSelector,
    panel: SelectionPanel,
    viewport: ViewportController,
    clusters: ClusterLayer,
    heatmap: HeatmapLayer,
    notifier: N,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl<N: Notifier> MapEngine<N> {
    pub fn new(config: EngineConfig, notifier: N) -> Self {
        let viewport =
            ViewportController::new(config.initial_view, config.min_zoom, config.max_zoom);
        Self {
            store: DetectionStore::new(),
            filters: FilterState::default(),
            mode: ModeSelector::default(),
            panel: SelectionPanel::new(),
            viewport,
            clusters: ClusterLayer::new(config.cluster.clone()),
            heatmap: HeatmapLayer::new(config.heatmap.clone()),
            notifier,
            metrics: MetricsRecorder::new(),
            logger: LogManager::new("engine"),
            config,
        }
    }

    /// Replaces the detection batch. An open selection survives only if its
    /// id is still present.
    pub fn load<I, E>(&mut self, batch: I) -> LoadReport
    where
        I: IntoIterator<Item = E>,
        E: Into<FeedEntry>,
    {
        let report = self.store.load(batch);
        self.metrics.record_load(report.accepted, report.dropped);
        let store = &self.store;
        let transition = self.panel.revalidate(|id| store.get(id));
        if transition != PanelTransition::Unchanged {
            self.logger
                .warn(&format!("selection dropped after reload: {transition:?}"));
        }
        report
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &DetectionStore {
        &self.store
    }

    pub fn filters(&self) -> FilterState {
        self.filters
    }

    pub fn mode(&self) -> RenderMode {
        self.mode.mode()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport.viewport()
    }

    pub fn viewport_revision(&self) -> u64 {
        self.viewport.revision()
    }

    pub fn panel(&self) -> &SelectionPanel {
        &self.panel
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Flips one severity filter. Ignored while the heatmap is showing.
    pub fn toggle_filter(&mut self, severity: Severity) -> bool {
        if !self.mode().filters_enabled() {
            self.logger
                .trace(&format!("filter toggle for {severity} ignored in heatmap mode"));
            return false;
        }
        self.filters = self.filters.toggled(severity);
        self.logger.trace(&format!(
            "{severity} now {}",
            if self.filters.is_visible(severity) { "shown" } else { "hidden" }
        ));
        true
    }

    pub fn set_mode(&mut self, mode: RenderMode) -> bool {
        let changed = self.mode.set_mode(mode);
        if changed {
            self.logger.trace(&format!("render mode -> {mode:?}"));
        }
        changed
    }

    pub fn visible(&self) -> Vec<&DetectionRecord> {
        visible_set(&self.store, &self.filters, self.mode())
    }

    /// Marker-mode nodes for the current view; empty in heatmap mode.
    pub fn clusters(&self) -> Vec<ClusterNode> {
        match self.mode() {
            RenderMode::Markers => self.clusters.render(&self.visible(), &self.viewport()),
            RenderMode::Heatmap => Vec::new(),
        }
    }

    /// Weighted points for every stored record, regardless of filters.
    pub fn heatmap_points(&self) -> Vec<HeatPoint> {
        heatmap_points(self.store.all())
    }

    pub fn heat_grid(&self, width: f32, height: f32) -> HeatGrid {
        self.heatmap
            .rasterize(&self.heatmap_points(), &self.viewport(), width, height)
    }

    /// Opens the panel on `id`. An id the store no longer holds closes the
    /// panel instead.
    pub fn select(&mut self, id: &str) -> PanelTransition {
        match self.store.get(id) {
            Some(record) => {
                let transition = self.panel.select(record.clone());
                if transition != PanelTransition::Unchanged {
                    self.metrics.record_selection();
                }
                transition
            }
            None => {
                self.logger.warn(&format!("selection of unknown detection {id}"));
                self.panel.close_with(CloseReason::Stale)
            }
        }
    }

    pub fn close_panel(&mut self) -> PanelTransition {
        self.panel.close()
    }

    /// Applies a terminal decision to the selected detection.
    pub fn decide(&mut self, action: DismissAction) -> PanelResult<PanelTransition> {
        let duration = Duration::from_millis(self.config.notification_duration_ms);
        let transition = self.panel.dismiss(action, &mut self.notifier, duration)?;
        self.metrics.record_decision();
        self.logger.record(&format!("decision {action:?}: {transition:?}"));
        Ok(transition)
    }

    /// Handles a click on a marker-mode node: leaves select, groups zoom in
    /// until they split.
    pub fn activate(&mut self, node: &ClusterNode) -> Activation {
        match node {
            ClusterNode::Leaf { record } => Activation::Selected(self.select(&record.id)),
            ClusterNode::Group {
                center,
                child_record_ids,
                ..
            } => {
                let current = self.viewport();
                let zoom = self.clusters.expansion_zoom(
                    &self.visible(),
                    child_record_ids,
                    current.zoom,
                    self.viewport.max_zoom(),
                );
                let changed = self.set_view(*center, zoom).unwrap_or(false);
                Activation::Expanded {
                    zoom: self.viewport().zoom,
                    changed,
                }
            }
        }
    }

    pub fn set_view(&mut self, center: GeoPoint, zoom: u8) -> Result<bool, ViewportError> {
        let changed = self.viewport.set_view(center, zoom)?;
        if changed {
            self.metrics.record_view_change();
        }
        Ok(changed)
    }

    pub fn zoom_in(&mut self) -> bool {
        self.track_view(|viewport| viewport.zoom_in())
    }

    pub fn zoom_out(&mut self) -> bool {
        self.track_view(|viewport| viewport.zoom_out())
    }

    pub fn reset_view(&mut self) -> bool {
        self.track_view(|viewport| viewport.reset())
    }

    fn track_view(&mut self, apply: impl FnOnce(&mut ViewportController) -> bool) -> bool {
        let changed = apply(&mut self.viewport);
        if changed {
            self.metrics.record_view_change();
        }
        changed
    }

    pub fn frame(&self) -> MapFrame {
        let visible = self.visible();
        let viewport = self.viewport();
        let (nodes, heat_points) = match self.mode() {
            RenderMode::Markers => (self.clusters.render(&visible, &viewport), Vec::new()),
            RenderMode::Heatmap => (Vec::new(), self.heatmap.render(&visible, &viewport)),
        };
        MapFrame {
            mode: self.mode(),
            filters: self.filters,
            viewport,
            visible_count: visible.len(),
            total_count: self.store.len(),
            nodes,
            heat_points,
            detail: self.panel.detail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::record::fixtures::raw;
    use crate::notify::{NotificationLevel, RecordingNotifier};

    fn engine() -> MapEngine<RecordingNotifier> {
        let mut engine = MapEngine::new(EngineConfig::default(), RecordingNotifier::new());
        engine.load(vec![
            raw("X", "severe", 51.5074, -0.1278),
            raw("Y", "moderate", 51.5085, -0.1250),
            raw("Z", "minor", 51.4900, -0.2000),
        ]);
        engine
    }

    fn visible_ids(engine: &MapEngine<RecordingNotifier>) -> Vec<String> {
        engine.visible().iter().map(|record| record.id.clone()).collect()
    }

    #[test]
    fn mode_round_trip_restores_filtered_view() {
        let mut engine = engine();
        engine.toggle_filter(Severity::Minor);
        let before = visible_ids(&engine);

        assert!(engine.set_mode(RenderMode::Heatmap));
        assert_eq!(engine.visible().len(), 3);
        assert!(!engine.filters().minor);
        assert!(engine.set_mode(RenderMode::Markers));

        assert_eq!(visible_ids(&engine), before);
    }

    #[test]
    fn filter_toggles_are_ignored_in_heatmap_mode() {
        let mut engine = engine();
        engine.set_mode(RenderMode::Heatmap);
        assert!(!engine.toggle_filter(Severity::Severe));
        assert_eq!(engine.filters(), FilterState::default());
    }

    #[test]
    fn heatmap_points_ignore_filters() {
        let mut engine = engine();
        engine.toggle_filter(Severity::Severe);
        engine.toggle_filter(Severity::Moderate);
        assert_eq!(engine.visible().len(), 1);
        assert_eq!(engine.heatmap_points().len(), engine.store().all().len());
    }

    #[test]
    fn heat_grid_covers_canvas_around_the_view() {
        let mut engine = engine();
        engine.toggle_filter(Severity::Severe);
        engine.set_mode(RenderMode::Heatmap);
        engine
            .set_view(GeoPoint::new(51.5074, -0.1278), 13)
            .unwrap();

        let grid = engine.heat_grid(400.0, 300.0);
        let rows = (300.0 / grid.cell_px).ceil() as usize;
        let cols = (400.0 / grid.cell_px).ceil() as usize;
        assert_eq!(grid.intensity.dim(), (rows, cols));
        assert!(grid.peak() > 0.0);
        assert!(grid.intensity[[rows / 2, cols / 2]] > 0.0);

        assert_eq!(engine.heat_grid(0.0, 0.0).intensity.len(), 0);
    }

    #[test]
    fn frame_carries_either_nodes_or_heat_points() {
        let mut engine = engine();
        let markers = engine.frame();
        assert!(!markers.nodes.is_empty());
        assert!(markers.heat_points.is_empty());

        engine.set_mode(RenderMode::Heatmap);
        let heat = engine.frame();
        assert!(heat.nodes.is_empty());
        assert_eq!(heat.heat_points.len(), 3);
        assert!(engine.clusters().is_empty());
    }

    #[test]
    fn direct_replace_sends_no_notifications() {
        let mut engine = engine();
        assert_eq!(engine.select("X"), PanelTransition::Opened { id: "X".into() });
        assert_eq!(
            engine.select("Y"),
            PanelTransition::Replaced {
                from: "X".into(),
                to: "Y".into()
            }
        );
        assert!(engine.notifier().sent().is_empty());
        assert_eq!(engine.frame().detail.unwrap().id, "Y");
    }

    #[test]
    fn decision_emits_one_notification() {
        let mut engine = engine();
        engine.select("X");
        engine.decide(DismissAction::CreateWorkOrder).unwrap();
        let sent = engine.notifier().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].level, NotificationLevel::Success);
        assert_eq!(sent[0].duration, Duration::from_millis(3000));
        assert!(!engine.panel().is_open());
        assert!(engine.decide(DismissAction::CreateWorkOrder).is_err());
        assert_eq!(engine.notifier().sent().len(), 1);
        assert_eq!(engine.metrics().decisions, 1);
    }

    #[test]
    fn unknown_id_closes_panel() {
        let mut engine = engine();
        engine.select("X");
        assert_eq!(
            engine.select("missing"),
            PanelTransition::Closed {
                id: "X".into(),
                reason: CloseReason::Stale
            }
        );
    }

    #[test]
    fn reload_drops_stale_selection() {
        let mut engine = engine();
        engine.select("Z");
        engine.load(vec![raw("X", "severe", 51.5074, -0.1278)]);
        assert!(!engine.panel().is_open());

        engine.select("X");
        engine.load(vec![raw("X", "minor", 51.5074, -0.1278)]);
        assert_eq!(engine.panel().selected().unwrap().severity, Severity::Minor);
    }

    #[test]
    fn activating_group_zooms_until_it_splits() {
        let mut engine = engine();
        engine.set_view(GeoPoint::new(51.5, -0.15), 9).unwrap();
        let nodes = engine.clusters();
        assert_eq!(nodes.len(), 1);

        let activation = engine.activate(&nodes[0]);
        let Activation::Expanded { zoom, changed } = activation else {
            panic!("expected expansion");
        };
        assert!(changed);
        assert!(zoom > 9);
        assert!(engine.clusters().len() > 1);
        assert_eq!(engine.viewport().center, nodes[0].position());
    }

    #[test]
    fn activating_leaf_selects() {
        let mut engine = engine();
        engine.set_view(GeoPoint::new(51.5, -0.15), 18).unwrap();
        let nodes = engine.clusters();
        let leaf = nodes
            .iter()
            .find(|node| node.record_ids() == ["Z"])
            .unwrap()
            .clone();
        assert_eq!(
            engine.activate(&leaf),
            Activation::Selected(PanelTransition::Opened { id: "Z".into() })
        );
    }

    #[test]
    fn identical_view_requests_are_idempotent() {
        let mut engine = engine();
        let centre = GeoPoint::new(51.52, -0.1);
        assert!(engine.set_view(centre, 14).unwrap());
        let revision = engine.viewport_revision();
        assert!(!engine.set_view(centre, 14).unwrap());
        assert_eq!(engine.viewport_revision(), revision);
        assert_eq!(engine.metrics().view_changes, 1);
    }

    #[test]
    fn empty_store_renders_nothing() {
        let engine = MapEngine::new(EngineConfig::default(), RecordingNotifier::new());
        let frame = engine.frame();
        assert_eq!(frame.visible_count, 0);
        assert!(frame.nodes.is_empty());
        assert!(frame.detail.is_none());
    }
}
