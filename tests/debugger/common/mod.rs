use rdbctl::debugger::{DebugSession, Error, EventHook, SessionOptions, Transport};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Clone, Default)]
pub struct TestInfo {
    pub stops: Arc<AtomicUsize>,
    pub errors: Arc<Mutex<Vec<String>>>,
}

impl TestInfo {
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct TestHooks {
    info: TestInfo,
}

impl TestHooks {
    pub fn new(info: TestInfo) -> Self {
        Self { info }
    }
}

impl EventHook for TestHooks {
    fn on_stop(&self) {
        self.info.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn on_error(&self, error: &Error) {
        self.info.errors.lock().unwrap().push(error.to_string());
    }
}

#[derive(Default)]
struct Channel {
    sent: Vec<String>,
    outbox: VecDeque<String>,
    closed: bool,
    mute_sync: bool,
    close_on_sync: bool,
}

/// Test side of the fake debug channel.
#[derive(Clone)]
pub struct ChannelControl(Arc<Mutex<Channel>>);

impl ChannelControl {
    /// Return and forget lines sent by session so far.
    pub fn take_sent(&self) -> Vec<String> {
        std::mem::take(&mut self.0.lock().unwrap().sent)
    }

    /// Put lines into channel as if the target sent them unsolicited.
    pub fn push(&self, lines: &[&str]) {
        let mut channel = self.0.lock().unwrap();
        channel.outbox.extend(lines.iter().map(ToString::to_string));
    }

    pub fn close(&self) {
        self.0.lock().unwrap().closed = true;
    }

    /// Stop echoing sync tokens.
    pub fn mute_sync(&self, mute: bool) {
        self.0.lock().unwrap().mute_sync = mute;
    }

    /// Close channel instead of echoing the next sync token.
    pub fn close_on_sync(&self) {
        self.0.lock().unwrap().close_on_sync = true;
    }
}

/// In-memory [`Transport`] that answers each sent line with a scripted reply.
/// Sync tokens are echoed after the reply of preceding commands.
pub struct FakeChannel {
    channel: Arc<Mutex<Channel>>,
    responder: Box<dyn FnMut(&str) -> Vec<String> + Send>,
}

impl FakeChannel {
    pub fn new(
        responder: impl FnMut(&str) -> Vec<String> + Send + 'static,
    ) -> (Self, ChannelControl) {
        let channel = Arc::new(Mutex::new(Channel::default()));
        (
            Self {
                channel: channel.clone(),
                responder: Box::new(responder),
            },
            ChannelControl(channel),
        )
    }
}

impl Transport for FakeChannel {
    fn send_line(&mut self, line: &str) -> Result<(), Error> {
        let mut channel = self.channel.lock().unwrap();
        if channel.closed {
            return Err(Error::TransportClosed);
        }
        channel.sent.push(line.to_string());

        let reply = (self.responder)(line);
        channel.outbox.extend(reply);
        if line.starts_with("echo ") {
            if channel.close_on_sync {
                channel.closed = true;
            } else if !channel.mute_sync {
                channel.outbox.push_back(format!("#{line}"));
            }
        }
        Ok(())
    }

    fn poll_line(&mut self) -> Result<Option<String>, Error> {
        let mut channel = self.channel.lock().unwrap();
        if let Some(line) = channel.outbox.pop_front() {
            return Ok(Some(line));
        }
        if channel.closed {
            return Err(Error::TransportClosed);
        }
        drop(channel);
        thread::sleep(Duration::from_millis(1));
        Ok(None)
    }
}

/// Scripted emulator: a single instruction stream of `nop`s, `D0` counts executed steps.
pub struct Machine {
    pub pc: u32,
    pub d0: u32,
    /// Reply to pause request with a stop notification.
    pub stop_on_break: bool,
    /// Surround reply blocks with protocol noise.
    pub noisy: bool,
    /// Fixed replies by command keyword, an empty reply means the command is never answered.
    pub scripted: HashMap<&'static str, Vec<String>>,
}

impl Machine {
    pub fn new(pc: u32) -> Self {
        Self {
            pc,
            d0: 0,
            stop_on_break: true,
            noisy: false,
            scripted: HashMap::new(),
        }
    }

    fn parse_args(line: &str) -> (u32, u32) {
        let mut args = line
            .split_whitespace()
            .skip(1)
            .map(|arg| u32::from_str_radix(arg.trim_start_matches('$'), 16).unwrap());
        (args.next().unwrap(), args.next().unwrap())
    }

    pub fn respond(&mut self, line: &str) -> Vec<String> {
        let command = line.split_whitespace().next().unwrap_or_default();
        if let Some(reply) = self.scripted.get(command) {
            return reply.clone();
        }
        let mut reply = match command {
            "status" => vec![format!("#status VBL:1 PC:{:06x}", self.pc), "##".to_string()],
            "registers" => vec![
                format!(
                    "#registers D0:{:08X} D1:00000000 A7:00010000 PC:{:08X} SR:2700",
                    self.d0, self.pc
                ),
                "##".to_string(),
            ],
            "memory" => {
                let (address, count) = Self::parse_args(line);
                let payload: String = (0..count)
                    .map(|i| format!("{:02x}", (address + i) as u8))
                    .collect();
                vec![
                    format!("#mem OK {address:06x} {count:06x} {payload}"),
                    "##".to_string(),
                ]
            }
            "disasm" => {
                let (address, count) = Self::parse_args(line);
                let mut lines = vec![format!("#disasm {address:06x}")];
                lines.extend(
                    (0..count / 6).map(|i| format!("- ${:06x}  4e71  nop", address + i * 2)),
                );
                lines.push("##".to_string());
                lines
            }
            "step" | "next" => {
                self.pc += 2;
                self.d0 += 1;
                vec!["!break".to_string()]
            }
            "break" if self.stop_on_break => vec!["!break".to_string()],
            "break" | "continue" | "echo" => vec![],
            "load" | "save" => vec![format!("{command}: OK")],
            _ => vec![format!("unknown command: {line}")],
        };

        if self.noisy && !reply.is_empty() && command != "echo" {
            reply.insert(0, "noise before block".to_string());
            reply.push("noise after block".to_string());
            reply.extend(["#trace on".to_string(), "##".to_string()]);
        }
        reply
    }
}

pub fn options() -> SessionOptions {
    SessionOptions {
        reply_timeout: Duration::from_millis(500),
        poll_interval: Duration::from_millis(5),
        ..SessionOptions::default()
    }
}

/// Wait until condition holds, return `false` on timeout.
pub fn wait_until(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

/// Session with a running target.
pub fn running_session(
    mut machine: Machine,
    options: SessionOptions,
) -> (DebugSession<TestHooks>, ChannelControl, TestInfo) {
    let (transport, control) = FakeChannel::new(move |line| machine.respond(line));
    let info = TestInfo::default();
    let session = DebugSession::new(Box::new(transport), options, TestHooks::new(info.clone()));
    (session, control, info)
}

/// Session with a target stopped by a pause request, sent lines are forgotten.
pub fn stopped_session(machine: Machine) -> (DebugSession<TestHooks>, ChannelControl, TestInfo) {
    let (mut session, control, info) = running_session(machine, options());
    session.request_pause_or_resume().unwrap();
    assert!(wait_until(Duration::from_secs(2), || session.is_stopped()));
    let target = session.shared_target().clone();
    assert!(wait_until(Duration::from_secs(2), || !target.watcher_active()));
    control.take_sent();
    (session, control, info)
}
