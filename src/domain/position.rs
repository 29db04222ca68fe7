//! Per-instrument long/short position record.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which half of a position an operation touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => f.write_str("LONG"),
            Side::Short => f.write_str("SHORT"),
        }
    }
}

/// Filled holdings of one instrument. Both halves are tracked independently,
/// so a book may be long and short the same instrument at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub long: u64,
    pub short: u64,
}

impl Position {
    pub fn get(&self, side: Side) -> u64 {
        match side {
            Side::Long => self.long,
            Side::Short => self.short,
        }
    }

    fn slot(&mut self, side: Side) -> &mut u64 {
        match side {
            Side::Long => &mut self.long,
            Side::Short => &mut self.short,
        }
    }

    /// Add `quantity` to `side`. Returns `false` and leaves the position
    /// untouched when the sum would overflow.
    pub fn try_add(&mut self, side: Side, quantity: u64) -> bool {
        let slot = self.slot(side);
        match slot.checked_add(quantity) {
            Some(total) => {
                *slot = total;
                true
            }
            None => false,
        }
    }

    /// Subtract `quantity` from `side`. Returns `false` and leaves the
    /// position untouched when the side holds less than `quantity`.
    pub fn try_sub(&mut self, side: Side, quantity: u64) -> bool {
        let slot = self.slot(side);
        match slot.checked_sub(quantity) {
            Some(rest) => {
                *slot = rest;
                true
            }
            None => false,
        }
    }
}
