use iced::{
    mouse, time,
    widget::{
        button,
        canvas::{self, Canvas, Frame, Geometry, Path, Stroke},
        column, row, scrollable, text, Column, Container,
    },
    Alignment, Color, Element, Length, Point, Rectangle, Renderer, Size, Subscription, Task,
    Theme,
};
use roadcore::detection::{parse_feed, BadgeTone, FeedEntry, GeoPoint, Severity};
use roadcore::layers::{gradient_color, ClusterNode};
use roadcore::math::{PixelPoint, WebMercator};
use roadcore::mode::RenderMode;
use roadcore::notify::{NotificationLevel, ToastId, ToastQueue};
use roadcore::selection::{DetailView, DismissAction};
use roadcore::viewport::Viewport;
use roadcore::{Activation, EngineConfig, MapEngine};
use std::time::{Duration, Instant};

const SAMPLE_FEED: &str = include_str!("../../data/london_feed.json");

fn main() -> iced::Result {
    iced::application(Visualizer::boot, Visualizer::update, Visualizer::view)
        .title(application_title)
        .subscription(application_subscription)
        .theme(application_theme)
        .run()
}

fn application_title(_: &Visualizer) -> String {
    "Roadwatch Triage Map".into()
}

fn application_subscription(_: &Visualizer) -> Subscription<Message> {
    time::every(Duration::from_millis(250)).map(|_| Message::Tick)
}

fn application_theme(_: &Visualizer) -> Theme {
    Theme::Dark
}

struct Visualizer {
    engine: MapEngine<ToastQueue>,
    status: String,
    history: Vec<String>,
}

#[derive(Debug, Clone)]
enum Message {
    Tick,
    ToggleHeatmap,
    ToggleSeverity(Severity),
    ZoomIn,
    ZoomOut,
    ResetView,
    Activate(usize),
    Decide(DismissAction),
    ClosePanel,
    DismissToast(ToastId),
}

fn initial_feed() -> (Vec<FeedEntry>, String) {
    let (label, contents) = match std::env::args().nth(1) {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(contents) => (path, contents),
            Err(err) => return (Vec::new(), format!("Could not read {path}: {err}")),
        },
        None => ("bundled sample".to_string(), SAMPLE_FEED.to_string()),
    };
    match parse_feed(&contents) {
        Ok(batch) => (batch, format!("Loaded feed from {label}")),
        Err(err) => (Vec::new(), format!("Feed {label} rejected: {err}")),
    }
}

impl Visualizer {
    fn boot() -> (Self, Task<Message>) {
        let mut engine = MapEngine::new(EngineConfig::default(), ToastQueue::new());
        let (batch, status) = initial_feed();
        let report = engine.load(batch);
        let mut visualizer = Visualizer {
            engine,
            status,
            history: Vec::new(),
        };
        visualizer.push_history(format!(
            "Loaded {} detections, dropped {}",
            report.accepted, report.dropped
        ));
        for rejection in &report.rejections {
            visualizer.push_history(format!(
                "Entry {} dropped: {}",
                rejection.index, rejection.reason
            ));
        }
        (visualizer, Task::none())
    }

    fn update(state: &mut Self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                state.engine.notifier_mut().expire(Instant::now());
            }
            Message::ToggleHeatmap => {
                let next = state.engine.mode().toggled();
                state.engine.set_mode(next);
                state.status = format!("Render mode: {next:?}");
            }
            Message::ToggleSeverity(severity) => {
                if state.engine.toggle_filter(severity) {
                    let shown = state.engine.filters().is_visible(severity);
                    state.status = format!(
                        "{} detections {}",
                        severity.label(),
                        if shown { "shown" } else { "hidden" }
                    );
                }
            }
            Message::ZoomIn => {
                state.engine.zoom_in();
            }
            Message::ZoomOut => {
                state.engine.zoom_out();
            }
            Message::ResetView => {
                state.engine.reset_view();
            }
            Message::Activate(index) => {
                if let Some(node) = state.engine.clusters().get(index).cloned() {
                    let entry = match state.engine.activate(&node) {
                        Activation::Selected(transition) => format!("Selection: {transition:?}"),
                        Activation::Expanded { zoom, .. } => {
                            format!("Expanded {} detections to zoom {zoom}", node.count())
                        }
                    };
                    state.push_history(entry);
                }
            }
            Message::Decide(action) => match state.engine.decide(action) {
                Ok(transition) => state.push_history(format!("Decision: {transition:?}")),
                Err(err) => state.status = err.to_string(),
            },
            Message::ClosePanel => {
                state.engine.close_panel();
            }
            Message::DismissToast(id) => {
                state.engine.notifier_mut().dismiss(id);
            }
        }
        Task::none()
    }

    fn view(state: &Self) -> Element<'_, Message> {
        let frame = state.engine.frame();
        let heatmap = frame.mode == RenderMode::Heatmap;
        let counts = state.engine.store().severity_counts();

        let severity_toggles = Severity::ALL.iter().fold(
            Column::new().spacing(6),
            |col, &severity| {
                let shown = frame.filters.is_visible(severity);
                let label = format!(
                    "[{}] {} ({})",
                    if shown { "x" } else { " " },
                    severity.label(),
                    counts[severity.index()]
                );
                col.push(
                    button(text(label).size(14))
                        .on_press_maybe((!heatmap).then_some(Message::ToggleSeverity(severity)))
                        .width(Length::Fill)
                        .padding(6),
                )
            },
        );

        let node_list = if frame.nodes.is_empty() {
            let empty = if heatmap { "Heatmap active" } else { "Nothing visible" };
            Column::new().push(text(empty).size(12))
        } else {
            frame.nodes.iter().enumerate().fold(
                Column::new().spacing(4),
                |col, (index, node)| col.push(node_button(index, node)),
            )
        };

        let controls = column![
            text("Map Layers").size(26),
            button(if heatmap { "Show markers" } else { "Show heatmap" })
                .on_press(Message::ToggleHeatmap)
                .padding(10),
            text("Severity").size(18),
            severity_toggles,
            row![
                button("+").on_press(Message::ZoomIn).padding(8),
                button("-").on_press(Message::ZoomOut).padding(8),
                button("Reset").on_press(Message::ResetView).padding(8),
            ]
            .spacing(6),
            text(format!(
                "Zoom {} | {}/{} visible",
                frame.viewport.zoom, frame.visible_count, frame.total_count
            ))
            .size(14),
            text(&state.status).size(14),
            text("Markers").size(18),
            Container::new(scrollable(node_list).height(Length::Fixed(240.0))).padding(6),
        ]
        .spacing(10)
        .padding(16)
        .width(Length::Fixed(300.0));

        let map = Canvas::new(MapCanvas {
            engine: &state.engine,
            viewport: frame.viewport,
            nodes: frame.nodes.clone(),
            show_heat: frame.mode == RenderMode::Heatmap,
            selected: frame.detail.as_ref().map(|detail| detail.id.clone()),
        })
        .width(Length::Fill)
        .height(Length::Fill);

        let detail = match &frame.detail {
            Some(view) => detail_panel(view),
            None => column![text("Select a marker to review it.").size(14)].into(),
        };

        let toasts = state.engine.notifier().active().iter().fold(
            Column::new().spacing(6),
            |col, toast| {
                col.push(
                    row![
                        text(&toast.message).size(14).color(level_color(toast.level)),
                        button("x").on_press(Message::DismissToast(toast.id)).padding(4),
                    ]
                    .spacing(8)
                    .align_y(Alignment::Center),
                )
            },
        );

        let history_list = state
            .history
            .iter()
            .rev()
            .fold(Column::new().spacing(4), |col, entry| {
                col.push(text(entry.clone()).size(12))
            });

        let side = column![
            text("Detection").size(26),
            detail,
            toasts,
            text("Activity log").size(16),
            Container::new(scrollable(history_list).height(Length::Fixed(160.0))).padding(6),
        ]
        .spacing(12)
        .padding(16)
        .width(Length::Fixed(340.0));

        let layout = row![controls, map, side]
            .spacing(12)
            .align_y(Alignment::Start)
            .padding(12);

        Container::new(layout)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn push_history(&mut self, entry: String) {
        self.history.push(entry);
        if self.history.len() > 20 {
            self.history.remove(0);
        }
    }
}

fn node_button(index: usize, node: &ClusterNode) -> Element<'static, Message> {
    let label = match node {
        ClusterNode::Leaf { record } => {
            format!("{} {} ({}%)", record.id, record.severity.label(), record.confidence)
        }
        ClusterNode::Group {
            count,
            dominant_severity,
            ..
        } => format!("{count} detections, worst {}", dominant_severity.label()),
    };
    button(text(label).size(12).color(rgb(node.color())))
        .on_press(Message::Activate(index))
        .width(Length::Fill)
        .padding(4)
        .into()
}

fn detail_panel(view: &DetailView) -> Element<'static, Message> {
    let badge = match view.badge {
        BadgeTone::Red => Color::from_rgb(0.83, 0.21, 0.11),
        BadgeTone::Yellow => Color::from_rgb(1.0, 0.87, 0.0),
    };
    let speed = view
        .vehicle_speed
        .map(|speed| format!("{speed} km/h"))
        .unwrap_or_else(|| "n/a".into());

    column![
        row![
            text(view.id.clone()).size(20),
            text(view.severity_label.clone()).size(14).color(badge),
        ]
        .spacing(10)
        .align_y(Alignment::Center),
        text(view.confidence_label.clone()).size(14),
        text(view.detected_label.clone()).size(12),
        text(view.location.clone()).size(14),
        text(format!("Depth: {}", view.depth_category)).size(12),
        text(format!("Passes: {} | Speed: {speed}", view.vehicle_count)).size(12),
        text(format!("Model: {}", view.model)).size(12),
        text(format!("Snapshot: {}", view.snapshot)).size(12),
        text(view.explanation.clone()).size(13),
        text(view.trust_warning).size(12).color(Color::from_rgb(0.96, 0.47, 0.22)),
        row![
            button("Create Work Order")
                .on_press(Message::Decide(DismissAction::CreateWorkOrder))
                .padding(8),
            button("Mark False Positive")
                .on_press(Message::Decide(DismissAction::MarkFalsePositive))
                .padding(8),
        ]
        .spacing(8),
        button("Close").on_press(Message::ClosePanel).padding(6),
    ]
    .spacing(6)
    .into()
}

fn rgb(color: [u8; 3]) -> Color {
    Color::from_rgb8(color[0], color[1], color[2])
}

fn level_color(level: NotificationLevel) -> Color {
    match level {
        NotificationLevel::Success => Color::from_rgb(0.0, 0.44, 0.24),
        NotificationLevel::Info => Color::from_rgb(0.11, 0.44, 0.72),
        NotificationLevel::Error => Color::from_rgb(0.83, 0.21, 0.11),
    }
}

struct MapCanvas<'a> {
    engine: &'a MapEngine<ToastQueue>,
    viewport: Viewport,
    nodes: Vec<ClusterNode>,
    show_heat: bool,
    selected: Option<String>,
}

fn marker_radius(node: &ClusterNode) -> f32 {
    match node {
        ClusterNode::Leaf { .. } => 7.0,
        ClusterNode::Group { count, .. } => 10.0 + (*count as f32).log2() * 3.0,
    }
}

impl MapCanvas<'_> {
    fn to_screen(&self, position: GeoPoint, bounds: &Rectangle) -> Point {
        let origin = WebMercator::project(self.viewport.center, self.viewport.zoom);
        let pixel: PixelPoint = WebMercator::project(position, self.viewport.zoom);
        Point::new(
            (pixel.x - origin.x) as f32 + bounds.width / 2.0,
            (pixel.y - origin.y) as f32 + bounds.height / 2.0,
        )
    }

    /// Index of the node under `point` (canvas-local), nearest first.
    fn hit_node(&self, point: Point, bounds: &Rectangle) -> Option<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                let distance = self.to_screen(node.position(), bounds).distance(point);
                (distance <= marker_radius(node)).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }
}

impl canvas::Program<Message> for MapCanvas<'_> {
    type State = ();

    fn update(
        &self,
        _state: &mut Self::State,
        event: &canvas::Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<canvas::Action<Message>> {
        let canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) = event else {
            return None;
        };
        let position = cursor.position_in(bounds)?;
        let index = self.hit_node(position, &bounds)?;
        Some(canvas::Action::publish(Message::Activate(index)).and_capture())
    }

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        frame.fill_rectangle(
            Point::ORIGIN,
            bounds.size(),
            Color::from_rgb(0.07, 0.08, 0.1),
        );

        if self.show_heat {
            let grid = self.engine.heat_grid(bounds.width, bounds.height);
            let gradient = &self.engine.config().heatmap.gradient;
            for ((row, col), value) in grid.intensity.indexed_iter() {
                let [r, g, b, a] = gradient_color(gradient, *value);
                if a == 0 {
                    continue;
                }
                frame.fill_rectangle(
                    Point::new(col as f32 * grid.cell_px, row as f32 * grid.cell_px),
                    Size::new(grid.cell_px, grid.cell_px),
                    Color::from_rgba8(r, g, b, f32::from(a) / 255.0 * 0.8),
                );
            }
        }

        for node in &self.nodes {
            let center = self.to_screen(node.position(), &bounds);
            let radius = marker_radius(node);
            let marker = Path::new(|builder| builder.circle(center, radius));
            frame.fill(&marker, rgb(node.color()));

            let is_selected = matches!(
                (node, &self.selected),
                (ClusterNode::Leaf { record }, Some(id)) if &record.id == id
            );
            if is_selected {
                let ring = Path::new(|builder| builder.circle(center, radius + 4.0));
                frame.stroke(
                    &ring,
                    Stroke::default().with_width(2.5).with_color(Color::WHITE),
                );
            }
        }

        vec![frame.into_geometry()]
    }
}
