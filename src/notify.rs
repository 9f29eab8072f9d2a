//! User-facing alerts.
//!
//! Transaction failures and network mismatches are surfaced to the person
//! driving the session, separately from logs.

use std::sync::{Arc, Mutex};

/// Sink for user-visible warnings.
pub trait Notifier: Send + Sync {
    fn alert(&self, message: &str);
}

/// Writes alerts to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn alert(&self, message: &str) {
        eprintln!("⚠️  {}", message);
    }
}

/// Keeps alerts in memory for assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    alerts: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts received so far, oldest first.
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        notifier.alert("first");
        notifier.alert("second");
        assert_eq!(notifier.alerts(), vec!["first", "second"]);
    }

    #[test]
    fn test_recording_notifier_clones_share_alerts() {
        let notifier = RecordingNotifier::new();
        let clone = notifier.clone();
        clone.alert("shared");
        assert_eq!(notifier.alerts().len(), 1);
    }
}
