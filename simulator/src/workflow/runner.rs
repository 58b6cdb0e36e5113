use crate::workflow::config::{SessionStep, WorkflowConfig};
use anyhow::Context;
use roadcore::detection::{FeedEntry, GeoPoint};
use roadcore::mode::RenderMode;
use roadcore::notify::{Notification, RecordingNotifier};
use roadcore::store::LoadReport;
use roadcore::telemetry::MetricsSnapshot;
use roadcore::{MapEngine, MapFrame};
use serde::Serialize;
use serde_json::{json, Value};

/// Engine state right after one scripted step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: SessionStep,
    pub outcome: Value,
    pub mode: RenderMode,
    pub visible: usize,
    pub nodes: usize,
    pub selected: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub load: LoadReport,
    pub steps: Vec<StepOutcome>,
    pub final_frame: MapFrame,
    pub notifications: Vec<Notification>,
    pub metrics: MetricsSnapshot,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self, batch: Vec<FeedEntry>) -> anyhow::Result<WorkflowResult> {
        let mut engine = MapEngine::new(self.config.engine.clone(), RecordingNotifier::new());
        if let Some((center, zoom)) = self.config.initial_center() {
            engine
                .set_view(center, zoom)
                .context("applying initial view")?;
        }

        let load = engine.load(batch);
        log::info!(
            "session loaded {} detections ({} dropped)",
            load.accepted,
            load.dropped
        );

        let mut steps = Vec::with_capacity(self.config.steps.len());
        for step in &self.config.steps {
            let outcome = apply(&mut engine, step);
            log::debug!("{step:?} -> {outcome}");
            let frame = engine.frame();
            steps.push(StepOutcome {
                step: step.clone(),
                outcome,
                mode: frame.mode,
                visible: frame.visible_count,
                nodes: frame.nodes.len(),
                selected: frame.detail.map(|detail| detail.id),
            });
        }

        Ok(WorkflowResult {
            load,
            steps,
            final_frame: engine.frame(),
            notifications: engine.notifier_mut().take(),
            metrics: engine.metrics(),
        })
    }
}

fn to_value<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Steps that cannot apply are recorded as rejected; the session goes on.
fn apply(engine: &mut MapEngine<RecordingNotifier>, step: &SessionStep) -> Value {
    match step {
        SessionStep::Toggle { severity } => json!({ "applied": engine.toggle_filter(*severity) }),
        SessionStep::Mode { mode } => json!({ "changed": engine.set_mode(*mode) }),
        SessionStep::Select { id } => to_value(engine.select(id)),
        SessionStep::Close => to_value(engine.close_panel()),
        SessionStep::Decide { decision } => match engine.decide(*decision) {
            Ok(transition) => to_value(transition),
            Err(err) => json!({ "rejected": err.to_string() }),
        },
        SessionStep::View { lat, lng, zoom } => {
            match engine.set_view(GeoPoint::new(*lat, *lng), *zoom) {
                Ok(changed) => json!({ "changed": changed }),
                Err(err) => json!({ "rejected": err.to_string() }),
            }
        }
        SessionStep::Activate { node } => match engine.clusters().get(*node).cloned() {
            Some(target) => to_value(engine.activate(&target)),
            None => json!({ "rejected": format!("no marker node at index {node}") }),
        },
        SessionStep::ZoomIn => json!({ "changed": engine.zoom_in() }),
        SessionStep::ZoomOut => json!({ "changed": engine.zoom_out() }),
        SessionStep::Reset => json!({ "changed": engine.reset_view() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::template::sample_feed;
    use roadcore::detection::Severity;
    use roadcore::selection::DismissAction;

    fn runner(steps: Vec<SessionStep>) -> Runner {
        Runner::new(WorkflowConfig {
            steps,
            ..Default::default()
        })
    }

    #[test]
    fn runner_executes_workflow() {
        let result = runner(vec![
            SessionStep::Toggle {
                severity: Severity::Minor,
            },
            SessionStep::Select {
                id: "P-1024".into(),
            },
            SessionStep::Select {
                id: "P-1026".into(),
            },
            SessionStep::Decide {
                decision: DismissAction::CreateWorkOrder,
            },
        ])
        .execute(sample_feed().unwrap())
        .unwrap();

        assert_eq!(result.load.accepted, 14);
        assert_eq!(result.steps.len(), 4);
        assert!(result.steps[0].visible < 14);
        assert_eq!(result.steps[2].selected.as_deref(), Some("P-1026"));
        assert_eq!(result.steps[3].selected, None);
        assert_eq!(result.notifications.len(), 1);
        assert_eq!(result.notifications[0].message, "Work Order created for P-1026");
        assert_eq!(result.metrics.decisions, 1);
    }

    #[test]
    fn decision_without_selection_is_recorded_not_fatal() {
        let result = runner(vec![SessionStep::Decide {
            decision: DismissAction::MarkFalsePositive,
        }])
        .execute(sample_feed().unwrap())
        .unwrap();
        assert!(result.steps[0].outcome.get("rejected").is_some());
        assert!(result.notifications.is_empty());
    }

    #[test]
    fn heatmap_mode_shows_all_records() {
        let result = runner(vec![
            SessionStep::Toggle {
                severity: Severity::Severe,
            },
            SessionStep::Mode {
                mode: RenderMode::Heatmap,
            },
        ])
        .execute(sample_feed().unwrap())
        .unwrap();
        assert_eq!(result.steps[1].visible, 14);
        assert_eq!(result.steps[1].nodes, 0);
        assert_eq!(result.final_frame.heat_points.len(), 14);
    }

    #[test]
    fn invalid_initial_view_fails_the_run() {
        let config = WorkflowConfig {
            initial_view: Some(roadcore::viewport::Viewport::new(
                GeoPoint::new(f64::NAN, 0.0),
                12,
            )),
            ..Default::default()
        };
        assert!(Runner::new(config).execute(Vec::new()).is_err());
    }

    #[test]
    fn bundled_workflow_runs() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../data/triage_workflow.yaml");
        let config = WorkflowConfig::load(path).unwrap();
        let batch = config.feed.resolve().unwrap();
        let result = Runner::new(config).execute(batch).unwrap();

        assert_eq!(result.steps.len(), 11);
        let messages: Vec<&str> = result
            .notifications
            .iter()
            .map(|note| note.message.as_str())
            .collect();
        assert_eq!(
            messages,
            [
                "Work Order created for P-1024",
                "Detection P-1031 marked as False Positive"
            ]
        );
        assert_eq!(result.steps[8].outcome["applied"], false);
        assert!(!result.final_frame.filters.minor);
        assert!(result.final_frame.filters.severe);
        assert_eq!(result.final_frame.viewport.zoom, 13);
    }

    #[test]
    fn activate_out_of_range_is_rejected() {
        let result = runner(vec![SessionStep::Activate { node: 999 }])
            .execute(sample_feed().unwrap())
            .unwrap();
        assert!(result.steps[0].outcome["rejected"]
            .as_str()
            .unwrap()
            .contains("999"));
    }
}
