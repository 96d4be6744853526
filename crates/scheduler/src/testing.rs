//! Notifier double for the bot jobs.

use async_trait::async_trait;
use options_bot_core::Notifier;
use parking_lot::Mutex;

/// Notifier that keeps every message it is asked to send.
#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    sent: Mutex<Vec<(String, bool)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(String, bool)> {
        self.sent.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(m, _)| m.clone()).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, msg: &str, silent: bool) {
        self.sent.lock().push((msg.to_string(), silent));
    }
}
