use crate::debugger::error::Error;
use crate::debugger::protocol::BlockSplitter;
use crate::debugger::session::{lock_transport, SharedTarget, SharedTransport};
use crate::debugger::transport;
use crate::debugger::EventHook;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Background loop that polls the debug channel for asynchronous stop notifications.
///
/// Loop terminates by itself as soon as the target is stopped, either by a
/// notification this watcher observes or by any other observer.
pub struct BreakWatcher<H: EventHook> {
    transport: SharedTransport,
    target: SharedTarget,
    hooks: Arc<H>,
    interval: Duration,
}

impl<H: EventHook> BreakWatcher<H> {
    pub(super) fn new(
        transport: SharedTransport,
        target: SharedTarget,
        hooks: Arc<H>,
        interval: Duration,
    ) -> Self {
        Self {
            transport,
            target,
            hooks,
            interval,
        }
    }

    /// Start polling in a background thread.
    /// Return [`None`] if target is stopped or another watcher is already active.
    pub fn spawn(self) -> Option<JoinHandle<()>> {
        if !self.target.begin_watch() {
            return None;
        }

        let target = self.target.clone();
        let spawned = thread::Builder::new()
            .name("break-watcher".to_string())
            .spawn(move || self.run());

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!(target: "watcher", "spawn break watcher: {e}");
                target.end_watch();
                None
            }
        }
    }

    fn run(self) {
        log::info!(target: "watcher", "awaiting target stop");

        loop {
            if self.target.end_watch_if_stopped() {
                break;
            }

            match self.poll() {
                Ok(true) => {
                    if self.target.mark_stopped() {
                        log::info!(target: "watcher", "target stopped");
                        self.hooks.on_stop();
                    }
                }
                Ok(false) => thread::sleep(self.interval),
                Err(e) => {
                    log::error!(target: "watcher", "poll debug channel: {e:#}");
                    self.target.end_watch();
                    self.hooks.on_error(&e);
                    break;
                }
            }
        }

        log::debug!(target: "watcher", "break watcher finished");
    }

    /// Drain available lines, return `true` if a stop notification is among them.
    fn poll(&self) -> Result<bool, Error> {
        let lines = {
            let mut transport = lock_transport(&self.transport);
            transport::drain_available(&mut **transport)?
        };

        let mut splitter = BlockSplitter::new();
        for line in &lines {
            if let Some(block) = splitter.push(line) {
                log::debug!(target: "watcher", "discard `{}` block", block.kind.keyword());
            }
        }
        Ok(splitter.stop_observed())
    }
}
