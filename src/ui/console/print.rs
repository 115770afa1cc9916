use rustyline::history::History;
use rustyline::{Editor, ExternalPrinter as RLExternalPrinter, Helper};
use std::cell::RefCell;
use std::fmt::Display;

/// Console output that doesn't break an active `(rdb)` prompt.
pub enum ExternalPrinter {
    /// Lines are printed above the prompt by the line editor.
    Prompt(RefCell<Box<dyn RLExternalPrinter>>),
    /// Terminal doesn't support external printing, lines go straight into stdout.
    Stdout,
}

impl ExternalPrinter {
    pub fn new<H: Helper, I: History>(editor: &mut Editor<H, I>) -> rustyline::Result<Self> {
        let printer = editor.create_external_printer()?;
        Ok(Self::Prompt(RefCell::new(Box::new(printer))))
    }

    pub fn stdout() -> Self {
        Self::Stdout
    }

    pub fn print(&self, msg: impl Display) {
        match self {
            Self::Stdout => println!("{msg}"),
            Self::Prompt(printer) => {
                if let Err(e) = printer.borrow_mut().print(msg.to_string()) {
                    log::warn!(target: "console", "print above prompt: {e}");
                }
            }
        }
    }

    /// Print message followed by an empty line.
    pub fn println(&self, msg: impl Display) {
        self.print(format!("{msg}\n"))
    }
}

pub mod style {
    use crossterm::style::{Color, Stylize};
    use std::fmt::{Display, Formatter};

    /// Colored fragment of a view line, `{:#}` prints it without color.
    fn write_colored(f: &mut Formatter<'_>, text: &dyn Display, color: Color) -> std::fmt::Result {
        if f.alternate() {
            write!(f, "{text}")
        } else {
            write!(f, "{}", text.to_string().with(color))
        }
    }

    macro_rules! view_struct {
        ($name: ident, $color: expr) => {
            pub struct $name<T: Display>(T);

            impl<T: Display> From<T> for $name<T> {
                fn from(value: T) -> Self {
                    Self(value)
                }
            }

            impl<T: Display> Display for $name<T> {
                fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                    write_colored(f, &self.0, $color)
                }
            }
        };
    }

    view_struct!(AddressView, Color::Blue);
    view_struct!(SymbolView, Color::Yellow);
    view_struct!(KeywordView, Color::Magenta);
    view_struct!(ChangedValueView, Color::DarkRed);
    view_struct!(FlagsView, Color::DarkGreen);
    view_struct!(ErrorView, Color::Red);

}
