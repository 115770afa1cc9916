use crate::debugger::{DebugSession, NavigationMove, SessionOptions, Transport};
use crate::ui::command::{Command, CommandError};
use crate::ui::config::{UiConfig, LINES_RANGE};
use crate::ui::console::help::help_for_command;
use crate::ui::console::hook::TerminalHook;
use crate::ui::console::print::style::{AddressView, ErrorView, KeywordView};
use crate::ui::console::print::ExternalPrinter;
use crate::weak_error;
use anyhow::anyhow;
use rustyline::error::ReadlineError;
use rustyline::history::MemHistory;
use rustyline::{Config, Editor};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Once;
use std::thread;

mod help;
mod hook;
pub mod print;
pub mod view;

const WELCOME_TEXT: &str = r#"
rdbctl greets, type help for list of commands
"#;
const PROMT: &str = "(rdb) ";

type RdbEditor = Editor<(), MemHistory>;

fn create_editor() -> rustyline::Result<RdbEditor> {
    let config = Config::builder()
        .auto_add_history(false)
        .max_history_size(1000)?
        .build();
    Editor::with_history(config, MemHistory::new())
}

pub struct AppBuilder {
    options: SessionOptions,
    config_path: Option<PathBuf>,
}

impl AppBuilder {
    /// Create builder, `config_path` is a file where changed view options are persisted.
    pub fn new(options: SessionOptions, config_path: Option<PathBuf>) -> Self {
        Self {
            options,
            config_path,
        }
    }

    pub fn build(self, transport: Box<dyn Transport>) -> anyhow::Result<TerminalApplication> {
        let (control_tx, control_rx) = mpsc::channel::<Control>();
        let editor = create_editor()?;
        let session = DebugSession::new(
            transport,
            self.options,
            TerminalHook::new(control_tx.clone()),
        );

        Ok(TerminalApplication {
            session,
            editor,
            config_path: self.config_path,
            control_tx,
            control_rx,
        })
    }
}

enum Control {
    /// New command from user received
    Cmd(String),
    /// Target reports a stop
    Stopped,
    /// Background polling of the debug channel failed
    WatcherFailure { message: String, fatal: bool },
    /// Terminate application
    Terminate,
}

pub struct TerminalApplication {
    session: DebugSession<TerminalHook>,
    editor: RdbEditor,
    config_path: Option<PathBuf>,
    control_tx: Sender<Control>,
    control_rx: Receiver<Control>,
}

static HELLO_ONCE: Once = Once::new();

impl TerminalApplication {
    pub fn run(mut self) -> anyhow::Result<()> {
        let app_loop = AppLoop {
            printer: ExternalPrinter::new(&mut self.editor).unwrap_or_else(|e| {
                log::warn!(target: "console", "external printer unavailable: {e}");
                ExternalPrinter::stdout()
            }),
            session: self.session,
            control_rx: self.control_rx,
            config_path: self.config_path,
        };

        let mut editor = self.editor;
        {
            let control_tx = self.control_tx;
            thread::spawn(move || {
                HELLO_ONCE.call_once(|| {
                    println!("{WELCOME_TEXT}");
                });

                loop {
                    let line = editor.readline(PROMT);
                    match line {
                        Ok(input) => {
                            let input = input.trim();
                            if input == "q" || input == "quit" {
                                _ = control_tx.send(Control::Terminate);
                                break;
                            } else if !input.is_empty() {
                                _ = editor.add_history_entry(input);
                                if control_tx.send(Control::Cmd(input.to_string())).is_err() {
                                    break;
                                }
                            }
                        }
                        Err(ReadlineError::Eof | ReadlineError::Interrupted) => {
                            _ = control_tx.send(Control::Terminate);
                            break;
                        }
                        Err(err) => {
                            println!("error: {:#}", err);
                            _ = control_tx.send(Control::Terminate);
                            break;
                        }
                    }
                }
            });
        }

        app_loop.run()
    }
}

struct AppLoop {
    session: DebugSession<TerminalHook>,
    control_rx: Receiver<Control>,
    printer: ExternalPrinter,
    config_path: Option<PathBuf>,
}

impl AppLoop {
    fn save_config(&self) {
        let Some(ref path) = self.config_path else {
            return;
        };
        let options = self.session.options();
        let config = UiConfig {
            lines: options.lines,
            follow_pc: options.follow_pc,
        };
        weak_error!(config.save(path), "save configuration:");
    }

    fn print_views(&self) {
        let lines = self.session.options().lines as usize;
        for &view in self.session.active_views() {
            let Some(decoded) = self.session.get_last_decoded(view) else {
                continue;
            };
            let marker = if view == self.session.focus() { "*" } else { " " };
            self.printer.print(format!("{marker}{}", KeywordView::from(view)));
            for line in view::render(view, decoded, lines) {
                self.printer.print(line);
            }
        }

        if self.session.focus().is_addressed() {
            if let Some(window) = self.session.get_current_window() {
                self.printer.print(format!("window: {}", AddressView::from(window)));
            }
        }
    }

    fn print_reply(&self, lines: Vec<String>) {
        for line in lines {
            self.printer.print(line);
        }
    }

    fn refresh(&mut self, mv: NavigationMove) -> Result<(), CommandError> {
        self.session.request_refresh(mv)?;
        self.print_views();
        Ok(())
    }

    fn handle_command(&mut self, cmd: &str) -> Result<(), CommandError> {
        match Command::parse(cmd)? {
            Command::View(view) => {
                self.session.set_focus(view);
                if self.session.is_stopped() {
                    self.refresh(NavigationMove::NONE)?;
                }
            }
            Command::Views(views) => {
                self.session.set_active_views(views);
                if self.session.is_stopped() {
                    self.refresh(NavigationMove::NONE)?;
                }
            }
            Command::Move(mv) => self.refresh(mv)?,
            Command::Goto(address) => {
                self.session.request_goto(address)?;
                self.print_views();
            }
            Command::StepInto => self.step(true)?,
            Command::StepOver => self.step(false)?,
            Command::Toggle => self.toggle()?,
            Command::Pause => {
                if self.session.is_stopped() {
                    self.printer.print("already stopped");
                } else {
                    self.toggle()?;
                }
            }
            Command::Continue => {
                if self.session.is_stopped() {
                    self.toggle()?;
                } else {
                    self.printer.print("already running");
                }
            }
            Command::Refresh => self.refresh(NavigationMove::NONE)?,
            Command::Lines(lines) => {
                if !LINES_RANGE.contains(&lines) {
                    return Err(CommandError::Parsing(format!(
                        "lines must be in {}..={}",
                        LINES_RANGE.start(),
                        LINES_RANGE.end()
                    )));
                }
                self.session.set_lines(lines);
                self.save_config();
                if self.session.is_stopped() {
                    self.refresh(NavigationMove::NONE)?;
                }
            }
            Command::FollowPc(follow_pc) => {
                self.session.set_follow_pc(follow_pc);
                self.save_config();
            }
            Command::LoadMemory { path, address } => {
                let address = address
                    .or(self.session.target().first)
                    .ok_or(CommandError::Parsing("no address to load at".to_string()))?;
                let reply = self.session.request_load_memory(&path, address)?;
                self.print_reply(reply);
            }
            Command::SaveMemory {
                path,
                address,
                length,
            } => {
                let reply = self.session.request_save_memory(&path, address, length)?;
                self.print_reply(reply);
            }
            Command::Raw(text) => {
                let reply = self.session.request_raw_command(&text)?;
                self.print_reply(reply);
            }
            Command::Help { command, reason } => {
                if let Some(reason) = reason {
                    self.printer.println(ErrorView::from(reason));
                }
                self.printer.println(help_for_command(command.as_deref()));
            }
        }

        Ok(())
    }

    fn step(&mut self, into: bool) -> Result<(), CommandError> {
        if !self.session.is_stopped() {
            self.printer.print("target is running, stop it first");
            return Ok(());
        }
        self.session.request_step(into)?;
        self.print_views();
        Ok(())
    }

    fn toggle(&mut self) -> Result<(), CommandError> {
        let was_stopped = self.session.is_stopped();
        self.session.request_pause_or_resume()?;
        if was_stopped {
            self.printer.print("running");
        } else {
            self.printer.print("stopping...");
        }
        Ok(())
    }

    fn handle_error(&self, e: CommandError) -> anyhow::Result<()> {
        match e {
            CommandError::Parsing(_) => {
                self.printer.print(ErrorView::from(e));
            }
            CommandError::Handle(ref err) if err.is_fatal() => {
                self.printer.print(ErrorView::from("shutdown"));
                self.printer
                    .print(ErrorView::from(format!("fatal session error: {e:#}")));
                return Err(anyhow!("fatal session error: {e:#}"));
            }
            CommandError::Handle(_) => {
                self.printer.print(ErrorView::from(format!("session error: {e:#}")));
            }
        }
        Ok(())
    }

    fn run(mut self) -> anyhow::Result<()> {
        let result = loop {
            let Ok(action) = self.control_rx.recv() else {
                break Ok(());
            };

            match action {
                Control::Cmd(command) => {
                    if let Err(e) = self.handle_command(&command) {
                        if let Err(fatal) = self.handle_error(e) {
                            break Err(fatal);
                        }
                    }
                }
                Control::Stopped => {
                    self.printer.print("target stopped");
                    if let Err(e) = self.refresh(NavigationMove::NONE) {
                        if let Err(fatal) = self.handle_error(e) {
                            break Err(fatal);
                        }
                    }
                }
                Control::WatcherFailure { message, fatal } => {
                    self.printer
                        .print(ErrorView::from(format!("await stop: {message}")));
                    if fatal {
                        break Err(anyhow!("await stop: {message}"));
                    }
                }
                Control::Terminate => {
                    break Ok(());
                }
            }
        };

        self.save_config();
        result
    }
}
