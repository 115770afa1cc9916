use crate::debugger::decode::{DecodedRegisters, DecodedView, Disassembly, MemoryBuffer};
use crate::debugger::register::Register;
use crate::debugger::{DecodeError, ViewKind};
use crate::ui::console::print::style::{
    AddressView, ChangedValueView, ErrorView, FlagsView, KeywordView, SymbolView,
};
use crossterm::style::Stylize;
use itertools::Itertools;

const REGISTERS_PER_ROW: usize = 4;

/// Render decoded view or its decode error into printable lines.
pub fn render(
    view: ViewKind,
    decoded: &Result<DecodedView, DecodeError>,
    lines: usize,
) -> Vec<String> {
    match decoded {
        Ok(DecodedView::Registers(regs)) => render_registers(regs),
        Ok(DecodedView::Memory(buf)) => render_memory(buf, lines),
        Ok(DecodedView::Disassembly(disasm)) => render_disassembly(disasm, lines),
        Err(e) => vec![format!(
            "{} {}",
            KeywordView::from(view),
            ErrorView::from(format!("malformed reply: {e}"))
        )],
    }
}

fn render_registers(regs: &DecodedRegisters) -> Vec<String> {
    let cells = regs
        .registers
        .iter()
        .map(|(register, value)| {
            let width = if register == Register::Sr { 4 } else { 8 };
            let value = format!("{value:0width$X}");
            let value = if regs.changed.contains(&register) {
                ChangedValueView::from(value).to_string().bold().to_string()
            } else {
                value
            };
            format!("{}: {value}", KeywordView::from(register))
        })
        .collect::<Vec<_>>();

    let mut rows = cells
        .chunks(REGISTERS_PER_ROW)
        .map(|row| row.join("  "))
        .collect::<Vec<_>>();
    if let Some(ref flags) = regs.sr_flags {
        rows.push(format!("{}: {}", KeywordView::from("SR flags"), FlagsView::from(flags)));
    }
    rows
}

fn render_memory(buf: &MemoryBuffer, lines: usize) -> Vec<String> {
    buf.rows()
        .take(lines)
        .map(|row| match row.split_once(" | ") {
            Some((address, bytes)) => format!("{} | {bytes}", AddressView::from(address)),
            None => row,
        })
        .collect()
}

fn render_disassembly(disasm: &Disassembly, lines: usize) -> Vec<String> {
    disasm
        .lines
        .iter()
        .take(lines)
        .map(|line| {
            let address = AddressView::from(format!("{:06x}", line.address));
            if line.symbol.is_empty() || line.symbol == "-" {
                format!("{address}: {}", line.raw_text)
            } else {
                format!(
                    "{}\n{address}: {}",
                    SymbolView::from(format!("{}:", line.symbol)),
                    line.raw_text
                )
            }
        })
        .collect_vec()
}
