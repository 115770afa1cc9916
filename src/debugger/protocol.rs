//! Line-oriented remote debug protocol: outgoing commands and incoming reply blocks.

use crate::debugger::address::AddressWindow;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// First character of a block start line.
pub const BLOCK_START: char = '#';
/// Exact block end line.
pub const BLOCK_END: &str = "##";
/// Asynchronous stop notification.
pub const BREAK_MARKER: &str = "!break";
/// Stop notification used by older emulator builds.
pub const LEGACY_BREAK_MARKER: &str = "#break";

const SYNC_COMMAND: &str = "echo";
const SYNC_TOKEN_PREFIX: &str = "sync-";

/// Return `true` if line is an asynchronous stop notification.
pub fn is_break_marker(line: &str) -> bool {
    let line = line.trim_end();
    line == BREAK_MARKER || line == LEGACY_BREAK_MARKER
}

/// Token of a sync echo command, unique per request cycle.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SyncToken(String);

impl SyncToken {
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("{SYNC_TOKEN_PREFIX}{n}"))
    }

    /// Line that the target sends back once all previous replies are transmitted.
    pub fn reply_line(&self) -> String {
        format!("{BLOCK_START}{SYNC_COMMAND} {}", self.0)
    }

    pub fn is_reply(&self, line: &str) -> bool {
        line.trim_end() == self.reply_line()
    }

    /// Return `true` if line is an echo of some other (outdated) sync token.
    pub fn is_stale_reply(&self, line: &str) -> bool {
        let line = line.trim_end();
        line.strip_prefix(BLOCK_START)
            .and_then(|l| l.strip_prefix(SYNC_COMMAND))
            .and_then(|l| l.strip_prefix(' '))
            .map(|token| token.starts_with(SYNC_TOKEN_PREFIX) && token != self.0)
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SyncToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Command sent to the target, one protocol line each.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum RemoteCommand {
    Status,
    Pause,
    Continue,
    Registers,
    Memory(AddressWindow),
    Disasm(AddressWindow),
    Step,
    Next,
    Load {
        path: PathBuf,
        address: u32,
    },
    Save {
        path: PathBuf,
        address: u32,
        length: u32,
    },
    Sync(SyncToken),
    Raw(String),
}

impl RemoteCommand {
    /// Encode command as a protocol line (without a line terminator).
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl Display for RemoteCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteCommand::Status => f.write_str("status"),
            RemoteCommand::Pause => f.write_str("break"),
            RemoteCommand::Continue => f.write_str("continue"),
            RemoteCommand::Registers => f.write_str("registers"),
            RemoteCommand::Memory(window) => {
                write!(f, "memory ${:06x} ${:06x}", window.first(), window.width())
            }
            RemoteCommand::Disasm(window) => {
                write!(f, "disasm ${:06x} ${:06x}", window.first(), window.width())
            }
            RemoteCommand::Step => f.write_str("step"),
            RemoteCommand::Next => f.write_str("next"),
            RemoteCommand::Load { path, address } => {
                write!(f, "load {} ${address:06x}", path.display())
            }
            RemoteCommand::Save {
                path,
                address,
                length,
            } => write!(f, "save {} ${address:06x} ${length:06x}", path.display()),
            RemoteCommand::Sync(token) => write!(f, "{SYNC_COMMAND} {token}"),
            RemoteCommand::Raw(text) => f.write_str(text.trim_end()),
        }
    }
}

/// Kind of reply block, determined by a keyword after the block start marker.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum BlockKind {
    Status,
    Registers,
    Memory,
    Disasm,
    Unknown(String),
}

impl BlockKind {
    fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "status" => BlockKind::Status,
            "registers" | "regs" => BlockKind::Registers,
            "mem" | "memory" => BlockKind::Memory,
            "disasm" => BlockKind::Disasm,
            other => BlockKind::Unknown(other.to_string()),
        }
    }

    pub fn keyword(&self) -> &str {
        match self {
            BlockKind::Status => "status",
            BlockKind::Registers => "registers",
            BlockKind::Memory => "mem",
            BlockKind::Disasm => "disasm",
            BlockKind::Unknown(kw) => kw,
        }
    }
}

/// One logical reply: a tag line followed by payload lines.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CommandBlock {
    pub kind: BlockKind,
    lines: Vec<String>,
}

impl CommandBlock {
    fn open(tag_line: &str) -> Self {
        let keyword = tag_line
            .trim_start_matches(BLOCK_START)
            .split_whitespace()
            .next()
            .unwrap_or_default();
        Self {
            kind: BlockKind::from_keyword(keyword),
            lines: vec![tag_line.to_string()],
        }
    }

    /// Tag line including the block start marker.
    pub fn tag_line(&self) -> &str {
        self.lines.first().map(String::as_str).unwrap_or_default()
    }

    /// Whitespace separated fields of the tag line, the tag itself excluded.
    pub fn tag_fields(&self) -> impl Iterator<Item = &str> {
        self.tag_line().split_whitespace().skip(1)
    }

    pub fn payload(&self) -> &[String] {
        self.lines.get(1..).unwrap_or_default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// Splits a line stream into command blocks.
///
/// A block end line emits an open block, a block start line opens a new one (implicitly
/// emitting an open block), any other line goes to an open block or is discarded.
#[derive(Default)]
pub struct BlockSplitter {
    current: Option<CommandBlock>,
    stop_observed: bool,
}

impl BlockSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a line, return a block if the line completes it.
    pub fn push(&mut self, line: &str) -> Option<CommandBlock> {
        let line = line.trim_end_matches(['\r', '\n']);

        if line.starts_with(BLOCK_END) {
            if self.current.is_none() {
                log::debug!(target: "protocol", "block end without open block");
            }
            return self.current.take();
        }

        if self.current.is_none() && is_break_marker(line) {
            self.stop_observed = true;
            return None;
        }

        if line.starts_with(BLOCK_START) {
            let unterminated = self.current.replace(CommandBlock::open(line));
            if let Some(ref block) = unterminated {
                log::debug!(
                    target: "protocol",
                    "block `{}` implicitly closed by `{line}`",
                    block.kind.keyword()
                );
            }
            return unterminated;
        }

        match self.current {
            Some(ref mut block) => block.lines.push(line.to_string()),
            None => log::debug!(target: "protocol", "discard noise line: {line}"),
        }
        None
    }

    /// Finish the stream, return a block left unterminated.
    pub fn finish(&mut self) -> Option<CommandBlock> {
        let unterminated = self.current.take();
        if let Some(ref block) = unterminated {
            log::debug!(target: "protocol", "unterminated block `{}`", block.kind.keyword());
        }
        unterminated
    }

    /// Return `true` if a stop notification was seen outside any block.
    pub fn stop_observed(&self) -> bool {
        self.stop_observed
    }
}

/// Reply of a request cycle split into blocks.
#[derive(Default, Debug)]
pub struct Reply {
    /// All received lines in order.
    pub lines: Vec<String>,
    pub blocks: Vec<CommandBlock>,
    pub stop_observed: bool,
}

impl Reply {
    pub fn block(&self, kind: &BlockKind) -> Option<&CommandBlock> {
        self.blocks.iter().find(|b| &b.kind == kind)
    }
}

/// Split ordered reply lines into command blocks.
pub fn split_reply<I, S>(lines: I) -> Reply
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut splitter = BlockSplitter::new();
    let mut reply = Reply::default();
    for line in lines {
        let line = line.as_ref();
        reply.blocks.extend(splitter.push(line));
        reply.lines.push(line.to_string());
    }
    reply.blocks.extend(splitter.finish());
    reply.stop_observed = splitter.stop_observed();
    reply
}
