//! Console commands.
//!
//! Command is a user request to the debug session: an action and a list of input arguments.
//! Commands are parsed from the console input line and executed by the console application.

pub mod parser;

use crate::debugger::address::{NavigationMove, ViewKind};
use crate::debugger::Error;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("malformed command: {0}")]
    Parsing(String),
    #[error(transparent)]
    Handle(#[from] Error),
}

pub type CommandResult<T> = Result<T, CommandError>;

/// External commands that can be processed by the console application.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Focus a view.
    View(ViewKind),
    /// Set views requested on each refresh.
    Views(Vec<ViewKind>),
    /// Move inspection window of the focused view.
    Move(NavigationMove),
    /// Inspect from an explicit address.
    Goto(u32),
    StepInto,
    StepOver,
    /// Stop running target or resume stopped one.
    Toggle,
    Pause,
    Continue,
    Refresh,
    Lines(u32),
    FollowPc(bool),
    /// Load file into memory, at the first address of inspection window if address is omitted.
    LoadMemory {
        path: PathBuf,
        address: Option<u32>,
    },
    SaveMemory {
        path: PathBuf,
        address: u32,
        length: u32,
    },
    /// Free-form command passed to the target as is.
    Raw(String),
    Help {
        command: Option<String>,
        reason: Option<String>,
    },
}
