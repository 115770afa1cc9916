use crate::debugger::{EventHook, Error};
use crate::ui::console::Control;
use std::sync::mpsc::Sender;

/// Forward asynchronous target events into the console application loop.
pub struct TerminalHook {
    control_tx: Sender<Control>,
}

impl TerminalHook {
    pub(super) fn new(control_tx: Sender<Control>) -> Self {
        Self { control_tx }
    }
}

impl EventHook for TerminalHook {
    fn on_stop(&self) {
        if self.control_tx.send(Control::Stopped).is_err() {
            log::debug!(target: "console", "application loop finished, stop event dropped");
        }
    }

    fn on_error(&self, error: &Error) {
        _ = self.control_tx.send(Control::WatcherFailure {
            message: error.to_string(),
            fatal: error.is_fatal(),
        });
    }
}
