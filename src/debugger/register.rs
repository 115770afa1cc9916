use std::collections::{BTreeMap, BTreeSet};
use strum_macros::{Display, EnumString};

/// Register of the target cpu.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, EnumString, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Register {
    D0,
    D1,
    D2,
    D3,
    D4,
    D5,
    D6,
    D7,
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    A7,
    Pc,
    Sr,
    Usp,
    Isp,
}

impl Register {
    /// Max value that register may hold.
    pub fn max_value(self) -> u32 {
        match self {
            Register::Sr => u16::MAX as u32,
            _ => u32::MAX,
        }
    }
}

/// Snapshot of register values.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct RegisterSet {
    values: BTreeMap<Register, u32>,
}

impl RegisterSet {
    pub fn insert(&mut self, register: Register, value: u32) {
        self.values.insert(register, value);
    }

    pub fn value(&self, register: Register) -> Option<u32> {
        self.values.get(&register).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Register, u32)> + '_ {
        self.values.iter().map(|(r, v)| (*r, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Return registers whose value differs from previous snapshot.
    /// Registers that are absent in previous snapshot are not considered changed.
    pub fn changed_since(&self, previous: &RegisterSet) -> BTreeSet<Register> {
        self.iter()
            .filter(|(r, v)| previous.value(*r).is_some_and(|prev| prev != *v))
            .map(|(r, _)| r)
            .collect()
    }

    /// Flag string of the status register, if known.
    pub fn sr_flags(&self) -> Option<String> {
        self.value(Register::Sr).map(|sr| sr_flags(sr as u16))
    }
}

/// Status register bits with their labels, from the highest bit.
const SR_BITS: [(u16, &str); 12] = [
    (15, "T1"),
    (14, "T0"),
    (13, "S"),
    (12, "M"),
    (10, "2"),
    (9, "1"),
    (8, "0"),
    (4, "X"),
    (3, "N"),
    (2, "Z"),
    (1, "V"),
    (0, "C"),
];

/// Render status register as a 14 character flag string, a clear bit renders as `-`
/// for each character of its label.
pub fn sr_flags(sr: u16) -> String {
    SR_BITS
        .iter()
        .map(|&(bit, label)| {
            if sr & (1 << bit) != 0 {
                label.to_string()
            } else {
                "-".repeat(label.len())
            }
        })
        .collect()
}
