use crate::debugger::decode::parse_hex;
use crate::debugger::error::DecodeError;
use crate::debugger::protocol::{BlockKind, CommandBlock};

/// Single disassembled instruction.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DisassemblyLine {
    pub address: u32,
    pub symbol: String,
    pub raw_text: String,
}

/// Instructions of a disassembly block and the block's leading address.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Disassembly {
    pub address: u32,
    pub lines: Vec<DisassemblyLine>,
}

impl Disassembly {
    /// Address where the second instruction begins.
    pub fn second_address(&self) -> Option<u32> {
        self.lines.get(1).map(|l| l.address)
    }

    /// Address of the last instruction shown within `max_lines`.
    pub fn last_shown_address(&self, max_lines: usize) -> Option<u32> {
        self.lines.iter().take(max_lines).last().map(|l| l.address)
    }
}

/// Decode a disassembly block: `#disasm <addressHex>` followed by
/// `symbol displayAddress rest...` lines.
pub fn decode(block: &CommandBlock) -> Result<Disassembly, DecodeError> {
    if block.kind != BlockKind::Disasm {
        return Err(DecodeError::UnexpectedKind {
            expected: "disasm",
            found: block.kind.keyword().to_string(),
        });
    }

    let address = block
        .tag_fields()
        .next()
        .ok_or(DecodeError::MissingField("address"))?;
    let address = parse_hex("address", address)?;

    let lines = block
        .payload()
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| decode_line(line))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Disassembly { address, lines })
}

fn decode_line(line: &str) -> Result<DisassemblyLine, DecodeError> {
    let line = line.trim();
    let (symbol, rest) = line
        .split_once(char::is_whitespace)
        .ok_or_else(|| DecodeError::MalformedToken(line.to_string()))?;
    let rest = rest.trim_start();
    let (display_address, raw_text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));

    Ok(DisassemblyLine {
        address: parse_hex("instruction address", display_address)?,
        symbol: symbol.to_string(),
        raw_text: raw_text.trim_start().to_string(),
    })
}
