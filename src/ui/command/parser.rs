use super::{Command, CommandError, CommandResult};
use crate::debugger::address::{Magnitude, NavigationMove, ViewKind, MAX_ADDRESS};
use std::path::PathBuf;
use std::str::FromStr;

pub const VIEW_COMMAND: &str = "view";
pub const VIEWS_COMMAND: &str = "views";
pub const GOTO_COMMAND: &str = "goto";
pub const GOTO_COMMAND_SHORT: &str = "g";
pub const STEP_INTO_COMMAND: &str = "step";
pub const STEP_INTO_COMMAND_SHORT: &str = "s";
pub const STEP_OVER_COMMAND: &str = "next";
pub const STEP_OVER_COMMAND_SHORT: &str = "n";
pub const TOGGLE_COMMAND: &str = "toggle";
pub const TOGGLE_COMMAND_SHORT: &str = "t";
pub const PAUSE_COMMAND: &str = "pause";
pub const CONTINUE_COMMAND: &str = "continue";
pub const CONTINUE_COMMAND_SHORT: &str = "c";
pub const REFRESH_COMMAND: &str = "refresh";
pub const REFRESH_COMMAND_SHORT: &str = "r";
pub const LINES_COMMAND: &str = "lines";
pub const FOLLOW_COMMAND: &str = "follow";
pub const LOAD_COMMAND: &str = "load";
pub const SAVE_COMMAND: &str = "save";
pub const RAW_COMMAND: &str = "raw";
pub const RAW_COMMAND_SHORT: &str = "!";
pub const HELP_COMMAND: &str = "help";
pub const HELP_COMMAND_SHORT: &str = "h";
pub const MOVE_COMMAND: &str = "move";

use chumsky::error::Rich;
use chumsky::prelude::{any, choice, end, just};
use chumsky::{extra, text, Boxed, IterParser, Parser};

type Err<'a> = extra::Err<Rich<'a, char>>;

/// Hexadecimal address, optionally prefixed with `$` or `0x`.
pub fn hex<'a>() -> impl Parser<'a, &'a str, u32, Err<'a>> + Clone {
    let prefix = choice((just("0x"), just("0X"), just("$"))).or_not();
    prefix
        .ignore_then(
            text::digits(16)
                .at_least(1)
                .at_most(8)
                .to_slice()
                .map(|s: &str| u32::from_str_radix(s, 16).unwrap_or_default()),
        )
        .padded()
        .labelled("hexadecimal number")
}

/// Hexadecimal address within the 24-bit address space.
pub fn address<'a>() -> impl Parser<'a, &'a str, u32, Err<'a>> + Clone {
    hex()
        .try_map(|address, span| {
            if address > MAX_ADDRESS {
                Err(Rich::custom(
                    span,
                    format!("address {address:#x} is out of 24-bit address space"),
                ))
            } else {
                Ok(address)
            }
        })
        .labelled("address")
}

fn number<'a>() -> impl Parser<'a, &'a str, u32, Err<'a>> + Clone {
    text::int(10)
        .try_map(|s: &str, span| {
            s.parse::<u32>()
                .map_err(|e| Rich::custom(span, format!("invalid number: {e}")))
        })
        .padded()
        .labelled("number")
}

fn file_path<'a>() -> impl Parser<'a, &'a str, PathBuf, Err<'a>> + Clone {
    any()
        .filter(|c: &char| !c.is_whitespace())
        .repeated()
        .at_least(1)
        .to_slice()
        .map(PathBuf::from)
        .padded()
        .labelled("file path")
}

fn view_kind<'a>() -> impl Parser<'a, &'a str, ViewKind, Err<'a>> + Clone {
    text::ident()
        .try_map(|s: &str, span| {
            ViewKind::from_str(s).map_err(|_| Rich::custom(span, format!("unknown view `{s}`")))
        })
        .padded()
        .labelled("view (regs, mem or disasm)")
}

fn navigation<'a>() -> impl Parser<'a, &'a str, NavigationMove, Err<'a>> + Clone {
    // longest first
    choice((
        just("<<<").to(NavigationMove::backward(Magnitude::Max)),
        just("<<").to(NavigationMove::backward(Magnitude::Med)),
        just("<").to(NavigationMove::backward(Magnitude::Min)),
        just(">>>").to(NavigationMove::forward(Magnitude::Max)),
        just(">>").to(NavigationMove::forward(Magnitude::Med)),
        just(">").to(NavigationMove::forward(Magnitude::Min)),
    ))
    .padded()
    .labelled("navigation move")
}

fn command<'a, I>(ctx: &'static str, inner: I) -> Boxed<'a, 'a, &'a str, Command, Err<'a>>
where
    I: Parser<'a, &'a str, Command, Err<'a>> + 'a,
{
    inner.then_ignore(end()).labelled(ctx).boxed()
}

impl Command {
    /// Parse input string into command.
    pub fn parse(input: &str) -> CommandResult<Command> {
        Self::parser()
            .parse(input)
            .into_result()
            .map_err(|e| {
                CommandError::Parsing(e.first().map(ToString::to_string).unwrap_or_default())
            })
    }

    fn parser<'a>() -> impl Parser<'a, &'a str, Command, Err<'a>> {
        let op = |sym| just(sym).padded();
        let op2 = |full, short| op(full).or(op(short));

        let view = op(VIEW_COMMAND).ignore_then(view_kind()).map(Command::View);
        let views = op(VIEWS_COMMAND)
            .ignore_then(view_kind().repeated().at_least(1).collect::<Vec<_>>())
            .map(Command::Views)
            .boxed();

        let r#move = navigation().map(Command::Move);
        let goto = op2(GOTO_COMMAND, GOTO_COMMAND_SHORT)
            .ignore_then(address())
            .map(Command::Goto);

        let step_into = op2(STEP_INTO_COMMAND, STEP_INTO_COMMAND_SHORT).to(Command::StepInto);
        let step_over = op2(STEP_OVER_COMMAND, STEP_OVER_COMMAND_SHORT).to(Command::StepOver);
        let toggle = op2(TOGGLE_COMMAND, TOGGLE_COMMAND_SHORT).to(Command::Toggle);
        let pause = op(PAUSE_COMMAND).to(Command::Pause);
        let r#continue = op2(CONTINUE_COMMAND, CONTINUE_COMMAND_SHORT).to(Command::Continue);
        let refresh = op2(REFRESH_COMMAND, REFRESH_COMMAND_SHORT).to(Command::Refresh);

        let lines = op(LINES_COMMAND).ignore_then(number()).map(Command::Lines);
        let follow = op(FOLLOW_COMMAND)
            .ignore_then(choice((op("on").to(true), op("off").to(false))))
            .map(Command::FollowPc);

        let load = op(LOAD_COMMAND)
            .ignore_then(file_path().then(address().or_not()))
            .map(|(path, address)| Command::LoadMemory { path, address })
            .boxed();
        let save = op(SAVE_COMMAND)
            .ignore_then(file_path().then(address()).then(hex()))
            .map(|((path, address), length)| Command::SaveMemory {
                path,
                address,
                length,
            })
            .boxed();

        let raw = op(RAW_COMMAND)
            .or(just(RAW_COMMAND_SHORT))
            .ignore_then(any().repeated().at_least(1).to_slice())
            .try_map(|s: &str, span| {
                let s = s.trim();
                if s.is_empty() {
                    Err(Rich::custom(span, "empty command"))
                } else {
                    Ok(Command::Raw(s.to_string()))
                }
            })
            .boxed();

        let help = op2(HELP_COMMAND, HELP_COMMAND_SHORT)
            .ignore_then(text::ident().or_not())
            .map(|s| Command::Help {
                command: s.map(ToOwned::to_owned),
                reason: None,
            })
            .padded()
            .boxed();

        choice((
            command(MOVE_COMMAND, r#move),
            command(VIEWS_COMMAND, views),
            command(VIEW_COMMAND, view),
            command(GOTO_COMMAND, goto),
            command(STEP_INTO_COMMAND, step_into),
            command(STEP_OVER_COMMAND, step_over),
            command(TOGGLE_COMMAND, toggle),
            command(PAUSE_COMMAND, pause),
            command(CONTINUE_COMMAND, r#continue),
            command(REFRESH_COMMAND, refresh),
            command(LINES_COMMAND, lines),
            command(FOLLOW_COMMAND, follow),
            command(LOAD_COMMAND, load),
            command(SAVE_COMMAND, save),
            command(RAW_COMMAND, raw),
            command(HELP_COMMAND, help),
        ))
        .map_err(|e| {
            let span = e.span();
            if span.start == 0 && span.end == 0 {
                Rich::custom(*e.span(), "type help for list of commands")
            } else {
                e
            }
        })
    }
}
