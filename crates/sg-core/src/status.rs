//! Operator-facing startup status.

/// Receives the human-readable status line for each startup step.
///
/// Reporters are passed in explicitly; nothing in the engine holds a
/// process-wide status slot.
pub trait StatusReporter {
    fn status(&self, message: &str);
}

/// Forwards status lines to the `log` facade at info level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStatus;

impl StatusReporter for LogStatus {
    fn status(&self, message: &str) {
        log::info!("Starting Server: {}", message);
    }
}

impl<F: Fn(&str)> StatusReporter for F {
    fn status(&self, message: &str) {
        self(message)
    }
}
