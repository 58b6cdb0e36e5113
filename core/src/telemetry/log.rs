use log::{debug, info, warn};

/// Thin per-component wrapper over the `log` facade.
#[derive(Debug, Clone, Copy)]
pub struct LogManager {
    component: &'static str,
}

impl LogManager {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }

    pub fn record(&self, message: &str) {
        info!(target: "roadcore", "[{}] {}", self.component, message);
    }

    pub fn warn(&self, message: &str) {
        warn!(target: "roadcore", "[{}] {}", self.component, message);
    }

    pub fn trace(&self, message: &str) {
        debug!(target: "roadcore", "[{}] {}", self.component, message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("engine")
    }
}
