use crate::debugger::address::{MAX_ADDRESS, MEMORY_ROW_WIDTH};
use crate::debugger::decode::parse_hex;
use crate::debugger::error::DecodeError;
use crate::debugger::protocol::{BlockKind, CommandBlock};
use itertools::Itertools;

const STATUS_OK: &str = "OK";

/// Decoded contiguous memory range `[start, start + len)`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MemoryBuffer {
    pub start: u32,
    pub bytes: Vec<u8>,
}

impl MemoryBuffer {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn end(&self) -> u32 {
        self.start + self.bytes.len() as u32
    }

    /// Render buffer as rows of 16 bytes, each row starts with its absolute address.
    pub fn rows(&self) -> impl Iterator<Item = String> + '_ {
        self.bytes
            .chunks(MEMORY_ROW_WIDTH as usize)
            .enumerate()
            .map(|(i, chunk)| {
                let address = self.start + i as u32 * MEMORY_ROW_WIDTH;
                let bytes = chunk.iter().map(|b| format!("{b:02x}")).join(" ");
                format!("{address:06x} | {bytes}")
            })
    }
}

/// Decode a memory block: `#mem <status> <addressHex> <sizeHex> <payloadHex>`.
///
/// Payload may continue on the following lines. Decoded length is authoritative,
/// declared size is advisory only.
pub fn decode(block: &CommandBlock) -> Result<MemoryBuffer, DecodeError> {
    if block.kind != BlockKind::Memory {
        return Err(DecodeError::UnexpectedKind {
            expected: "mem",
            found: block.kind.keyword().to_string(),
        });
    }

    let mut fields = block.tag_fields();
    let status = fields.next().ok_or(DecodeError::MissingField("status"))?;
    if status != STATUS_OK {
        return Err(DecodeError::Rejected(status.to_string()));
    }

    let start = parse_hex(
        "address",
        fields.next().ok_or(DecodeError::MissingField("address"))?,
    )?;
    if start > MAX_ADDRESS {
        return Err(DecodeError::ValueOutOfRange {
            field: "address",
            value: start,
        });
    }
    let declared_size = parse_hex(
        "size",
        fields.next().ok_or(DecodeError::MissingField("size"))?,
    )?;

    let payload: String = fields
        .chain(block.payload().iter().map(|line| line.trim()))
        .collect();
    let bytes = hex::decode(&payload).map_err(|_| DecodeError::InvalidHex {
        field: "payload",
        value: payload.clone(),
    })?;

    if u64::from(start) + bytes.len() as u64 > u64::from(MAX_ADDRESS) + 1 {
        return Err(DecodeError::ValueOutOfRange {
            field: "size",
            value: u32::try_from(bytes.len()).unwrap_or(u32::MAX),
        });
    }

    if bytes.len() != declared_size as usize {
        log::warn!(
            target: "protocol",
            "memory reply at ${start:06x}: declared size {declared_size:#x}, decoded {:#x} bytes",
            bytes.len()
        );
    }

    Ok(MemoryBuffer { start, bytes })
}
