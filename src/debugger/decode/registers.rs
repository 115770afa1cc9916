use crate::debugger::decode::parse_hex;
use crate::debugger::error::DecodeError;
use crate::debugger::protocol::{BlockKind, CommandBlock};
use crate::debugger::register::{Register, RegisterSet};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Register snapshot with registers changed since the previous one.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DecodedRegisters {
    pub registers: RegisterSet,
    pub changed: BTreeSet<Register>,
    pub sr_flags: Option<String>,
}

/// Decode `NAME:HEXVALUE` tokens of a registers block.
pub fn decode(
    block: &CommandBlock,
    previous: Option<&RegisterSet>,
) -> Result<DecodedRegisters, DecodeError> {
    if block.kind != BlockKind::Registers {
        return Err(DecodeError::UnexpectedKind {
            expected: "registers",
            found: block.kind.keyword().to_string(),
        });
    }

    let payload_tokens = block
        .payload()
        .iter()
        .flat_map(|line| line.split_whitespace());

    let mut registers = RegisterSet::default();
    for token in block.tag_fields().chain(payload_tokens) {
        let (name, value) = token
            .split_once(':')
            .ok_or_else(|| DecodeError::MalformedToken(token.to_string()))?;

        let register = Register::from_str(&name.to_ascii_uppercase())
            .map_err(|_| DecodeError::UnknownRegister(name.to_string()))?;
        let value = parse_hex("register", value)?;
        if value > register.max_value() {
            return Err(DecodeError::ValueOutOfRange {
                field: "SR",
                value,
            });
        }

        registers.insert(register, value);
    }

    if registers.is_empty() {
        return Err(DecodeError::EmptyBlock);
    }

    let changed = previous
        .map(|prev| registers.changed_since(prev))
        .unwrap_or_default();
    let sr_flags = registers.sr_flags();

    Ok(DecodedRegisters {
        registers,
        changed,
        sr_flags,
    })
}
