//! Decoders of reply blocks into structured view data.
//!
//! Each decoder is stateless and fails independently: an error in one block
//! never prevents other blocks of the same reply from being decoded.

pub mod disasm;
pub mod memory;
pub mod registers;

pub use disasm::{Disassembly, DisassemblyLine};
pub use memory::MemoryBuffer;
pub use registers::DecodedRegisters;

use crate::debugger::address::ViewKind;
use crate::debugger::error::{DecodeError, Error};
use crate::debugger::protocol::{BlockKind, CommandBlock};
use crate::debugger::register::RegisterSet;

/// Decoded data of a single view.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum DecodedView {
    Registers(DecodedRegisters),
    Memory(MemoryBuffer),
    Disassembly(Disassembly),
}

impl DecodedView {
    pub fn view(&self) -> ViewKind {
        match self {
            DecodedView::Registers(_) => ViewKind::Registers,
            DecodedView::Memory(_) => ViewKind::Memory,
            DecodedView::Disassembly(_) => ViewKind::Disassembly,
        }
    }
}

/// Route a block to the decoder of its kind.
///
/// Return [`None`] for blocks that don't belong to any view (status and unknown blocks).
///
/// # Arguments
///
/// * `block`: reply block
/// * `previous`: previous register snapshot, used to compute changed registers
pub fn decode_block(
    block: &CommandBlock,
    previous: Option<&RegisterSet>,
) -> Option<(ViewKind, Result<DecodedView, DecodeError>)> {
    let decoded = match block.kind {
        BlockKind::Registers => (
            ViewKind::Registers,
            registers::decode(block, previous).map(DecodedView::Registers),
        ),
        BlockKind::Memory => (
            ViewKind::Memory,
            memory::decode(block).map(DecodedView::Memory),
        ),
        BlockKind::Disasm => (
            ViewKind::Disassembly,
            disasm::decode(block).map(DecodedView::Disassembly),
        ),
        BlockKind::Status => return None,
        BlockKind::Unknown(ref keyword) => {
            log::debug!(target: "protocol", "skip block of unknown kind `{keyword}`");
            return None;
        }
    };
    Some(decoded)
}

/// Extract program counter from a status block (`PC:<hex>` token).
pub fn program_counter(block: &CommandBlock) -> Result<u32, Error> {
    if block.kind != BlockKind::Status {
        return Err(DecodeError::UnexpectedKind {
            expected: "status",
            found: block.kind.keyword().to_string(),
        }
        .into());
    }

    let pc = block
        .lines()
        .iter()
        .flat_map(|line| line.split_whitespace())
        .find_map(|token| token.strip_prefix("PC:"))
        .ok_or(Error::NoProgramCounter)?;
    Ok(parse_hex("PC", pc)?)
}

/// Parse a hex number, `$`/`0x` prefix and `:` suffix are allowed.
pub(super) fn parse_hex(field: &'static str, value: &str) -> Result<u32, DecodeError> {
    let digits = value.trim_end_matches(':');
    let digits = digits
        .strip_prefix('$')
        .or_else(|| digits.strip_prefix("0x"))
        .unwrap_or(digits);

    u32::from_str_radix(digits, 16).map_err(|_| DecodeError::InvalidHex {
        field,
        value: value.to_string(),
    })
}
