use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::detection::{BadgeTone, DetectionRecord};
use crate::notify::{Notification, NotificationLevel, Notifier};
use crate::prelude::{PanelError, PanelResult};

pub const TRUST_WARNING: &str = "Automated detection. Verify before dispatching repair crews.";

/// Terminal operator decision taken from the detail panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DismissAction {
    CreateWorkOrder,
    MarkFalsePositive,
}

impl DismissAction {
    pub fn notification(self, id: &str, duration: Duration) -> Notification {
        match self {
            DismissAction::CreateWorkOrder => Notification::new(
                format!("Work Order created for {id}"),
                NotificationLevel::Success,
                duration,
            ),
            DismissAction::MarkFalsePositive => Notification::new(
                format!("Detection {id} marked as False Positive"),
                NotificationLevel::Info,
                duration,
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    User,
    Decision(DismissAction),
    Stale,
}

/// What a panel operation did, for the presentation layer and for logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transition", rename_all = "snake_case")]
pub enum PanelTransition {
    Opened { id: String },
    Replaced { from: String, to: String },
    Closed { id: String, reason: CloseReason },
    Unchanged,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PanelState {
    #[default]
    Closed,
    Open(DetectionRecord),
}

/// Single-selection detail panel.
#[derive(Debug, Clone, Default)]
pub struct SelectionPanel {
    state: PanelState,
}

impl SelectionPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn selected(&self) -> Option<&DetectionRecord> {
        match &self.state {
            PanelState::Open(record) => Some(record),
            PanelState::Closed => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, PanelState::Open(_))
    }

    /// Opens the panel on `record`, swapping content in place if another
    /// record is already showing.
    pub fn select(&mut self, record: DetectionRecord) -> PanelTransition {
        let transition = match &self.state {
            PanelState::Closed => PanelTransition::Opened {
                id: record.id.clone(),
            },
            PanelState::Open(current) if current.id == record.id => PanelTransition::Unchanged,
            PanelState::Open(current) => PanelTransition::Replaced {
                from: current.id.clone(),
                to: record.id.clone(),
            },
        };
        self.state = PanelState::Open(record);
        transition
    }

    pub fn close(&mut self) -> PanelTransition {
        self.close_with(CloseReason::User)
    }

    /// Records a terminal decision: notifies once, then closes.
    pub fn dismiss<N>(
        &mut self,
        action: DismissAction,
        notifier: &mut N,
        duration: Duration,
    ) -> PanelResult<PanelTransition>
    where
        N: Notifier + ?Sized,
    {
        let id = self
            .selected()
            .map(|record| record.id.clone())
            .ok_or(PanelError::NothingSelected)?;
        notifier.notify(action.notification(&id, duration));
        Ok(self.close_with(CloseReason::Decision(action)))
    }

    /// Re-resolves the open record after a reload. Closes with
    /// [`CloseReason::Stale`] when its id no longer exists.
    pub fn revalidate<'a, F>(&mut self, lookup: F) -> PanelTransition
    where
        F: Fn(&str) -> Option<&'a DetectionRecord>,
    {
        let Some(current) = self.selected() else {
            return PanelTransition::Unchanged;
        };
        match lookup(&current.id) {
            Some(fresh) => {
                self.state = PanelState::Open(fresh.clone());
                PanelTransition::Unchanged
            }
            None => self.close_with(CloseReason::Stale),
        }
    }

    pub fn close_with(&mut self, reason: CloseReason) -> PanelTransition {
        match std::mem::take(&mut self.state) {
            PanelState::Open(record) => PanelTransition::Closed {
                id: record.id,
                reason,
            },
            PanelState::Closed => PanelTransition::Unchanged,
        }
    }

    pub fn detail(&self) -> Option<DetailView> {
        self.selected().map(DetailView::from)
    }
}

/// Flattened side-panel content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailView {
    pub id: String,
    pub severity_label: String,
    pub badge: BadgeTone,
    pub color_hex: String,
    pub confidence_label: String,
    pub detected_label: String,
    pub location: String,
    pub explanation: String,
    pub model: String,
    pub vehicle_count: u32,
    pub vehicle_speed: Option<u32>,
    pub depth_category: String,
    pub snapshot: String,
    pub trust_warning: &'static str,
}

impl From<&DetectionRecord> for DetailView {
    fn from(record: &DetectionRecord) -> Self {
        Self {
            id: record.id.clone(),
            severity_label: record.severity.label().to_uppercase(),
            badge: record.severity.badge(),
            color_hex: record.severity.color_hex(),
            confidence_label: format!("AI Confidence: {}%", record.confidence),
            detected_label: format!(
                "Detected: {}",
                record.detected_at.format("%d %b %Y, %H:%M UTC")
            ),
            location: record.metadata.location.clone(),
            explanation: record.metadata.explanation.clone(),
            model: record.metadata.model.clone(),
            vehicle_count: record.metadata.vehicle_count,
            vehicle_speed: record.metadata.vehicle_speed,
            depth_category: record.metadata.depth_category.clone(),
            snapshot: record.metadata.snapshot.clone(),
            trust_warning: TRUST_WARNING,
        }
    }
}
