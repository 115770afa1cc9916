use crate::debugger::address::{AddressWindow, Cursor, NavigationMove, ViewKind, MAX_ADDRESS};
use crate::debugger::decode::{self, DecodedView};
use crate::debugger::error::{DecodeError, Error};
use crate::debugger::protocol::{split_reply, BlockKind, RemoteCommand, Reply, SyncToken};
use crate::debugger::register::RegisterSet;
use crate::debugger::transport::{self, Transport};
use crate::debugger::watcher::BreakWatcher;
use crate::debugger::EventHook;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Session level options.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    /// Lines per view.
    pub lines: u32,
    /// Re-anchor inspection window at program counter each time the target stops.
    pub follow_pc: bool,
    /// Max time to wait for a reply.
    pub reply_timeout: Duration,
    /// Interval of background polling for stop notifications.
    pub poll_interval: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            lines: 12,
            follow_pc: true,
            reply_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(200),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SessionState {
    Idle,
    AwaitingStatus,
    AwaitingReply,
    Stopped,
    Running,
}

/// Inspection position and execution state of the target.
///
/// Invariant: `first <= last` when both are set.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct TargetState {
    pub first: Option<u32>,
    pub second: Option<u32>,
    pub last: Option<u32>,
    pub stopped: bool,
}

impl TargetState {
    pub fn cursor(&self) -> Option<Cursor> {
        self.first.map(|first| Cursor {
            first,
            second: self.second,
            last: self.last,
        })
    }

    /// Forget observed addresses, keep first address unless it must follow PC.
    fn clear(&mut self, follow_pc: bool) {
        if follow_pc {
            self.first = None;
        }
        self.second = None;
        self.last = None;
    }
}

#[derive(Default)]
struct Shared {
    target: TargetState,
    watcher_active: bool,
}

/// [`TargetState`] shared between session and background watcher.
#[derive(Clone, Default)]
pub struct SharedTarget(Arc<Mutex<Shared>>);

impl SharedTarget {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> TargetState {
        self.lock().target
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().target.stopped
    }

    /// Mark target as stopped. Return `true` only if target was running before,
    /// so concurrent observers of the same stop agree on a single transition.
    pub fn mark_stopped(&self) -> bool {
        let mut shared = self.lock();
        !std::mem::replace(&mut shared.target.stopped, true)
    }

    fn update(&self, f: impl FnOnce(&mut TargetState)) {
        f(&mut self.lock().target)
    }

    /// Register a new watcher. Return `false` if target is stopped or a watcher is already active.
    pub(super) fn begin_watch(&self) -> bool {
        let mut shared = self.lock();
        if shared.watcher_active || shared.target.stopped {
            return false;
        }
        shared.watcher_active = true;
        true
    }

    /// Unregister watcher if target is stopped. Return `true` if watcher must exit.
    pub(super) fn end_watch_if_stopped(&self) -> bool {
        let mut shared = self.lock();
        if shared.target.stopped {
            shared.watcher_active = false;
        }
        shared.target.stopped
    }

    pub(super) fn end_watch(&self) {
        self.lock().watcher_active = false;
    }

    pub fn watcher_active(&self) -> bool {
        self.lock().watcher_active
    }
}

pub(super) type SharedTransport = Arc<Mutex<Box<dyn Transport>>>;

pub(super) fn lock_transport(transport: &SharedTransport) -> MutexGuard<'_, Box<dyn Transport>> {
    transport.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Debug session controller.
///
/// Issues requests to the target, awaits replies and dispatches reply blocks to view
/// decoders. While target is running a [`BreakWatcher`] polls the channel for
/// asynchronous stop notifications, at most one reader consumes the channel at a time.
pub struct DebugSession<H: EventHook> {
    transport: SharedTransport,
    target: SharedTarget,
    hooks: Arc<H>,
    options: SessionOptions,
    state: SessionState,
    views: BTreeSet<ViewKind>,
    focus: ViewKind,
    windows: BTreeMap<ViewKind, AddressWindow>,
    decoded: BTreeMap<ViewKind, Result<DecodedView, DecodeError>>,
    registers: Option<RegisterSet>,
}

impl<H: EventHook> DebugSession<H> {
    pub fn new(transport: Box<dyn Transport>, options: SessionOptions, hooks: H) -> Self {
        Self {
            transport: Arc::new(Mutex::new(transport)),
            target: SharedTarget::default(),
            hooks: Arc::new(hooks),
            options,
            state: SessionState::Idle,
            views: BTreeSet::from([ViewKind::Registers]),
            focus: ViewKind::Registers,
            windows: BTreeMap::new(),
            decoded: BTreeMap::new(),
            registers: None,
        }
    }

    /// Return current session state.
    pub fn state(&self) -> SessionState {
        match self.state {
            SessionState::Idle | SessionState::Running | SessionState::AwaitingReply
                if self.target.is_stopped() =>
            {
                SessionState::Stopped
            }
            state => state,
        }
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            log::debug!(target: "session", "state {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.target.is_stopped()
    }

    pub fn target(&self) -> TargetState {
        self.target.snapshot()
    }

    pub fn shared_target(&self) -> &SharedTarget {
        &self.target
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn set_lines(&mut self, lines: u32) {
        self.options.lines = lines.max(1);
    }

    pub fn set_follow_pc(&mut self, follow_pc: bool) {
        self.options.follow_pc = follow_pc;
    }

    pub fn focus(&self) -> ViewKind {
        self.focus
    }

    pub fn active_views(&self) -> &BTreeSet<ViewKind> {
        &self.views
    }

    /// Focus a view, navigation moves apply to the focused view only.
    /// The view becomes active if it isn't.
    pub fn set_focus(&mut self, view: ViewKind) {
        if self.focus != view {
            // continuation addresses belong to the previously focused view
            self.target.update(|t| {
                t.second = None;
                t.last = None;
            });
            self.focus = view;
        }
        self.views.insert(view);
    }

    /// Set views requested on each refresh. The focused view is always active.
    pub fn set_active_views(&mut self, views: impl IntoIterator<Item = ViewKind>) {
        self.views = views.into_iter().collect();
        self.views.insert(self.focus);
    }

    /// Return window of the focused view requested by the last refresh.
    pub fn get_current_window(&self) -> Option<AddressWindow> {
        self.windows.get(&self.focus).copied()
    }

    /// Return the last decoded result of a view.
    pub fn get_last_decoded(&self, view: ViewKind) -> Option<&Result<DecodedView, DecodeError>> {
        self.decoded.get(&view)
    }

    /// Return text for the address entry: first address of the inspection window.
    pub fn address_entry(&self) -> Option<String> {
        self.target().first.map(|first| format!("{first:06X}"))
    }

    fn clear_target(&mut self) {
        let follow_pc = self.options.follow_pc;
        self.target.update(|t| t.clear(follow_pc));
        self.windows.clear();
    }

    /// Mark target stopped if reply contains a stop notification.
    fn observe_stop(&self, reply: &Reply) {
        if reply.stop_observed && self.target.mark_stopped() {
            log::info!(target: "session", "target stopped");
            self.hooks.on_stop();
        }
    }

    fn spawn_watcher(&self) {
        let watcher = BreakWatcher::new(
            self.transport.clone(),
            self.target.clone(),
            self.hooks.clone(),
            self.options.poll_interval,
        );
        if watcher.spawn().is_none() {
            log::debug!(target: "session", "break watcher already active");
        }
    }

    /// Send commands followed by a sync echo and read a reply.
    fn exchange(&self, mut commands: Vec<RemoteCommand>) -> Result<Reply, Error> {
        let token = SyncToken::next();
        commands.push(RemoteCommand::Sync(token.clone()));

        let mut transport = lock_transport(&self.transport);
        transport::send_batch(&mut **transport, &commands)?;
        let lines =
            transport::read_until_sync(&mut **transport, &token, self.options.reply_timeout)?;
        drop(transport);

        let reply = split_reply(&lines);
        self.observe_stop(&reply);
        Ok(reply)
    }

    /// Stop a running target or resume a stopped one.
    ///
    /// Stop is asynchronous: a pause request is sent and a [`BreakWatcher`] awaits
    /// the stop notification, [`EventHook::on_stop`] is called after it arrives.
    pub fn request_pause_or_resume(&mut self) -> Result<(), Error> {
        if self.is_stopped() {
            self.send(RemoteCommand::Continue)?;
            self.target.update(|t| t.stopped = false);
            self.clear_target();
            self.set_state(SessionState::Running);
            log::info!(target: "session", "target resumed");
        } else {
            self.send(RemoteCommand::Pause)?;
            self.set_state(SessionState::AwaitingReply);
        }
        self.spawn_watcher();
        Ok(())
    }

    fn send(&self, command: RemoteCommand) -> Result<(), Error> {
        let mut transport = lock_transport(&self.transport);
        transport::send_batch(&mut **transport, &[command])
    }

    /// Execute a single instruction, step over subroutine calls if `into` is false.
    /// Ignored if target is running.
    pub fn request_step(&mut self, into: bool) -> Result<(), Error> {
        if !self.is_stopped() {
            log::debug!(target: "session", "ignore step request, target is running");
            return Ok(());
        }

        let prev_state = self.state;
        let result = self.step(into);
        if result.is_err() {
            self.set_state(prev_state);
        }
        result
    }

    fn step(&mut self, into: bool) -> Result<(), Error> {
        self.set_state(SessionState::AwaitingReply);

        let command = if into {
            RemoteCommand::Step
        } else {
            RemoteCommand::Next
        };
        {
            let mut transport = lock_transport(&self.transport);
            transport::send_batch(&mut **transport, &[command])?;
            let noise = transport::read_until_break(&mut **transport, self.options.reply_timeout)?;
            for line in noise {
                log::debug!(target: "protocol", "discard line while stepping: {line}");
            }
        }

        self.clear_target();
        self.set_state(SessionState::Stopped);
        self.refresh(None, NavigationMove::NONE)
    }

    /// Refresh all active views, apply navigation move to the focused view.
    pub fn request_refresh(&mut self, mv: NavigationMove) -> Result<(), Error> {
        self.refresh(None, mv)
    }

    /// Refresh all active views starting at an explicit address.
    pub fn request_goto(&mut self, address: u32) -> Result<(), Error> {
        if address > MAX_ADDRESS {
            return Err(Error::AddressOutOfRange(address));
        }
        self.refresh(Some(address), NavigationMove::NONE)
    }

    fn refresh(&mut self, address: Option<u32>, mv: NavigationMove) -> Result<(), Error> {
        if !self.is_stopped() {
            return Err(Error::NotStopped);
        }

        let prev_state = self.state;
        let result = self.refresh_cycle(address, mv);
        match result {
            Ok(_) => self.set_state(SessionState::Stopped),
            Err(_) => self.set_state(prev_state),
        }
        result
    }

    fn refresh_cycle(&mut self, address: Option<u32>, mv: NavigationMove) -> Result<(), Error> {
        let mut staged = self.target.snapshot();

        // status must precede view requests, they depend on a fresh PC
        self.set_state(SessionState::AwaitingStatus);
        let status = self.exchange(vec![RemoteCommand::Status])?;
        let pc = status.block(&BlockKind::Status).map(decode::program_counter);

        match address {
            Some(address) => {
                staged.first = Some(address);
                staged.second = None;
                staged.last = None;
            }
            None if staged.first.is_none() => {
                let pc = pc.unwrap_or(Err(Error::NoProgramCounter))?;
                log::debug!(target: "session", "follow pc ${pc:06x}");
                staged.first = Some(pc);
            }
            None => {
                if let Some(Err(e)) = pc {
                    log::warn!(target: "session", "status reply: {e:#}");
                }
            }
        }

        let cursor = staged.cursor().ok_or(Error::NoProgramCounter)?;
        let mut windows = BTreeMap::new();
        let mut commands = vec![];
        for &view in &self.views {
            let view_mv = if view == self.focus {
                mv
            } else {
                NavigationMove::NONE
            };
            let window = view.compute_window(cursor, view_mv, self.options.lines)?;
            let command = match (view, window) {
                (ViewKind::Memory, Some(window)) => RemoteCommand::Memory(window),
                (ViewKind::Disassembly, Some(window)) => RemoteCommand::Disasm(window),
                _ => RemoteCommand::Registers,
            };
            if let Some(window) = window {
                windows.insert(view, window);
            }
            commands.push(command);
        }

        if let Some(window) = windows.get(&self.focus) {
            staged.first = Some(window.first());
            staged.second = window.second();
            staged.last = Some(window.last());
        }

        self.set_state(SessionState::AwaitingReply);
        let reply = self.exchange(commands)?;

        let mut decoded = BTreeMap::new();
        for block in &reply.blocks {
            let Some((view, result)) = decode::decode_block(block, self.registers.as_ref()) else {
                continue;
            };
            if !self.views.contains(&view) {
                log::debug!(target: "session", "skip block of inactive view {view}");
                continue;
            }
            if let Err(ref e) = result {
                log::warn!(target: "session", "decode {view} reply: {e:#}");
            }
            decoded.insert(view, result);
        }

        for view in &self.views {
            if !decoded.contains_key(view) {
                log::warn!(target: "session", "no reply block for {view} view");
            }
        }

        if self.focus == ViewKind::Disassembly {
            if let Some(Ok(DecodedView::Disassembly(disasm))) = decoded.get(&ViewKind::Disassembly)
            {
                staged.second = disasm.second_address();
                staged.last = disasm.last_shown_address(self.options.lines as usize);
            }
        }

        // commit
        if let Some(Ok(DecodedView::Registers(regs))) = decoded.get(&ViewKind::Registers) {
            self.registers = Some(regs.registers.clone());
        }
        self.target.update(|t| {
            t.first = staged.first;
            t.second = staged.second;
            t.last = staged.last;
        });
        self.windows = windows;
        self.decoded = decoded;

        Ok(())
    }

    /// Send a free-form command, return reply lines.
    pub fn request_raw_command(&mut self, text: &str) -> Result<Vec<String>, Error> {
        let reply = self.exchange(vec![RemoteCommand::Raw(text.to_string())])?;
        Ok(reply.lines)
    }

    /// Load file contents into target memory at address.
    pub fn request_load_memory(&mut self, path: &Path, address: u32) -> Result<Vec<String>, Error> {
        let reply = self.exchange(vec![RemoteCommand::Load {
            path: path.to_path_buf(),
            address,
        }])?;
        Ok(reply.lines)
    }

    /// Save target memory range `[address, address + length)` into file.
    pub fn request_save_memory(
        &mut self,
        path: &Path,
        address: u32,
        length: u32,
    ) -> Result<Vec<String>, Error> {
        let reply = self.exchange(vec![RemoteCommand::Save {
            path: path.to_path_buf(),
            address,
            length,
        }])?;
        Ok(reply.lines)
    }
}
