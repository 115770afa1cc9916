use crate::debugger::Error;
use std::fmt::{Display, Formatter};
use strum_macros::{Display as StrumDisplay, EnumString};

/// Highest address of the target 24-bit address space.
pub const MAX_ADDRESS: u32 = 0xFF_FFFF;
/// Bytes in one memory dump row.
pub const MEMORY_ROW_WIDTH: u32 = 16;
/// Worst case size of a single instruction with its arguments.
/// Disassembly requests over-fetch with this size to fill a whole screen.
pub const DISASM_BYTES_PER_LINE: u32 = 6;

/// Kind of inspection view.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, EnumString, StrumDisplay)]
#[strum(serialize_all = "snake_case")]
pub enum ViewKind {
    #[strum(serialize = "registers", serialize = "regs")]
    Registers,
    #[strum(serialize = "memory", serialize = "mem")]
    Memory,
    #[strum(serialize = "disassembly", serialize = "disasm")]
    Disassembly,
}

impl ViewKind {
    /// Return `true` if view shows an address range (and so depends on a window).
    pub fn is_addressed(self) -> bool {
        !matches!(self, ViewKind::Registers)
    }

    /// Compute a window for the next request of this view.
    ///
    /// # Arguments
    ///
    /// * `cursor`: current inspection position
    /// * `mv`: requested navigation move
    /// * `lines`: lines per view
    ///
    /// Return [`None`] for views without an address range.
    pub fn compute_window(
        self,
        cursor: Cursor,
        mv: NavigationMove,
        lines: u32,
    ) -> Result<Option<AddressWindow>, Error> {
        let lines = i64::from(lines.max(1));
        let address = i64::from(cursor.first);

        match self {
            ViewKind::Registers => Ok(None),
            ViewKind::Memory => {
                let row = i64::from(MEMORY_ROW_WIDTH);
                let screenful = lines * row;
                // no move, left/right, up/down, page up/down (no overlap)
                let offset = [0, 2, row, screenful][mv.magnitude.index()];
                let address = match mv.direction {
                    Direction::Forward => address + offset,
                    Direction::Backward => address - offset,
                };

                let window = AddressWindow::clamped(address, address + screenful)?;
                let second = (window.first + MEMORY_ROW_WIDTH).min(window.last);
                Ok(Some(window.with_second(second)))
            }
            ViewKind::Disassembly => {
                let mut screenful = lines * i64::from(DISASM_BYTES_PER_LINE);
                // no move, left/right, up/down, page up/down
                let offset = [0, 2, 4, screenful][mv.magnitude.index()];

                let address = match mv.direction {
                    Direction::Backward => {
                        let address = (address - offset).max(0);
                        // force one line of overlap with the previous screen
                        if mv.magnitude == Magnitude::Max {
                            if let Some(second) = cursor.second.map(i64::from) {
                                if second > address {
                                    screenful = second - address;
                                }
                            }
                        }
                        address
                    }
                    Direction::Forward => match (mv.magnitude, cursor.second, cursor.last) {
                        (Magnitude::Med, Some(second), _) => i64::from(second),
                        (Magnitude::Max, _, Some(last)) => i64::from(last),
                        _ => address + offset,
                    },
                };

                AddressWindow::clamped(address, address + screenful).map(Some)
            }
        }
    }
}

/// Magnitude of a navigation move.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum Magnitude {
    #[default]
    None,
    Min,
    Med,
    Max,
}

impl Magnitude {
    fn index(self) -> usize {
        match self {
            Magnitude::None => 0,
            Magnitude::Min => 1,
            Magnitude::Med => 2,
            Magnitude::Max => 3,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

/// Move of an inspection window (left/right, up/down, page up/down or nothing).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct NavigationMove {
    pub magnitude: Magnitude,
    pub direction: Direction,
}

impl NavigationMove {
    pub const NONE: NavigationMove = NavigationMove {
        magnitude: Magnitude::None,
        direction: Direction::Forward,
    };

    pub fn forward(magnitude: Magnitude) -> Self {
        Self {
            magnitude,
            direction: Direction::Forward,
        }
    }

    pub fn backward(magnitude: Magnitude) -> Self {
        Self {
            magnitude,
            direction: Direction::Backward,
        }
    }

    /// Return the move in the opposite direction with the same magnitude.
    pub fn inverse(self) -> Self {
        let direction = match self.direction {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        };
        Self {
            magnitude: self.magnitude,
            direction,
        }
    }

    pub fn is_none(self) -> bool {
        self.magnitude == Magnitude::None
    }
}

/// Current inspection position: a first address and, if already observed,
/// the addresses where the second and the last line of the previous screen begin.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Cursor {
    pub first: u32,
    pub second: Option<u32>,
    pub last: Option<u32>,
}

impl Cursor {
    pub fn at(first: u32) -> Self {
        Self {
            first,
            second: None,
            last: None,
        }
    }
}

/// Half-open address range `[first, last)` inside the 24-bit address space.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct AddressWindow {
    first: u32,
    last: u32,
    second: Option<u32>,
}

impl AddressWindow {
    /// Create a window from a raw range, shifting it into the address space.
    /// Window width is preserved whenever the address space permits it.
    ///
    /// Degenerate range (`first >= last`) is a contract violation and return
    /// [`Error::RangeInvariantViolation`].
    pub fn clamped(first: i64, last: i64) -> Result<Self, Error> {
        if first >= last {
            return Err(Error::RangeInvariantViolation { first, last });
        }

        let max = i64::from(MAX_ADDRESS);
        let width = last - first;
        let (mut first, mut last) = (first, last);
        if first < 0 {
            last -= first;
            first = 0;
        }
        if last > max {
            first = max - width;
            last = max;
        }
        // window is wider than the whole address space
        let first = first.max(0);

        Ok(Self {
            first: first as u32,
            last: last as u32,
            second: None,
        })
    }

    fn with_second(self, second: u32) -> Self {
        Self {
            second: Some(second),
            ..self
        }
    }

    pub fn first(&self) -> u32 {
        self.first
    }

    pub fn last(&self) -> u32 {
        self.last
    }

    /// Continuation hint: where the second line of this window begins, if known in advance.
    pub fn second(&self) -> Option<u32> {
        self.second
    }

    pub fn width(&self) -> u32 {
        self.last - self.first
    }
}

impl Display for AddressWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:06x}-${:06x}", self.first, self.last)
    }
}
