//! Per-hand gesture flags.
//!
//! Each hand is reduced to a small bitset every tick: exactly one of the
//! presence/gesture bits, plus [`HandFlags::PINCH`] when the hand is pinching.
//! A condition is another bitset; it matches when the two intersect.
//!
//! Flags are written in configuration as `|`-separated names:
//!
//! ```
//! use hand_tracking::checker::HandFlags;
//!
//! let f: HandFlags = "fist|pinch".parse().unwrap();
//! assert!(f.contains(HandFlags::FIST));
//! assert_eq!(f.to_string(), "fist|pinch");
//! assert_eq!("any".parse::<HandFlags>().unwrap(), HandFlags::ANY);
//! ```

use std::fmt;
use std::ops::{BitAnd, BitOr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::hand::{GestureResult, GestureType};

/// Bitset over hand presence, gesture and pinch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HandFlags(u32);

impl HandFlags {
    pub const NONE: HandFlags = HandFlags(0);
    pub const NO_HAND: HandFlags = HandFlags(1);
    pub const UNKNOWN: HandFlags = HandFlags(2 << GestureType::Unknown as u32);
    pub const POINT: HandFlags = HandFlags(2 << GestureType::Point as u32);
    pub const FIST: HandFlags = HandFlags(2 << GestureType::Fist as u32);
    pub const OK: HandFlags = HandFlags(2 << GestureType::Ok as u32);
    pub const LIKE: HandFlags = HandFlags(2 << GestureType::Like as u32);
    pub const FIVE: HandFlags = HandFlags(2 << GestureType::Five as u32);
    pub const VICTORY: HandFlags = HandFlags(2 << GestureType::Victory as u32);
    pub const PINCH: HandFlags = HandFlags(8192);
    pub const ANY: HandFlags = HandFlags(
        Self::NO_HAND.0
            | Self::UNKNOWN.0
            | Self::POINT.0
            | Self::FIST.0
            | Self::OK.0
            | Self::LIKE.0
            | Self::FIVE.0
            | Self::VICTORY.0
            | Self::PINCH.0,
    );

    /// Named single flags, in display order.
    const NAMED: [(&'static str, HandFlags); 9] = [
        ("no-hand", Self::NO_HAND),
        ("unknown", Self::UNKNOWN),
        ("point", Self::POINT),
        ("fist", Self::FIST),
        ("ok", Self::OK),
        ("like", Self::LIKE),
        ("five", Self::FIVE),
        ("victory", Self::VICTORY),
        ("pinch", Self::PINCH),
    ];

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn for_gesture(gesture: GestureType) -> Self {
        HandFlags(2 << gesture as u32)
    }

    /// Flags describing one hand this tick.  `None` is the no-hand sentinel.
    pub fn for_hand(hand: Option<&GestureResult>) -> Self {
        match hand {
            None => Self::NO_HAND,
            Some(h) if h.pinch.is_pinching => Self::for_gesture(h.gesture) | Self::PINCH,
            Some(h) => Self::for_gesture(h.gesture),
        }
    }

    /// `true` when at least one bit is shared.
    pub fn intersects(self, other: HandFlags) -> bool {
        self.0 & other.0 != 0
    }

    /// `true` when every bit of `other` is set in `self`.
    pub fn contains(self, other: HandFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for HandFlags {
    fn default() -> Self {
        Self::ANY
    }
}

impl BitOr for HandFlags {
    type Output = HandFlags;

    fn bitor(self, rhs: HandFlags) -> HandFlags {
        HandFlags(self.0 | rhs.0)
    }
}

impl BitAnd for HandFlags {
    type Output = HandFlags;

    fn bitand(self, rhs: HandFlags) -> HandFlags {
        HandFlags(self.0 & rhs.0)
    }
}

// ---------------------------------------------------------------------------
// Text form
// ---------------------------------------------------------------------------

/// Error returned when a flag expression names an unknown flag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown hand flag `{0}`")]
pub struct ParseFlagsError(String);

impl FromStr for HandFlags {
    type Err = ParseFlagsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut flags = HandFlags::NONE;
        for part in s.split('|').map(str::trim) {
            let part = part.to_ascii_lowercase();
            flags = flags
                | match part.as_str() {
                    "any" => HandFlags::ANY,
                    "none" => HandFlags::NONE,
                    _ => HandFlags::NAMED
                        .iter()
                        .find(|(name, _)| *name == part)
                        .map(|(_, f)| *f)
                        .ok_or(ParseFlagsError(part.clone()))?,
                };
        }
        Ok(flags)
    }
}

impl fmt::Display for HandFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ANY {
            return f.write_str("any");
        }
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = Self::NAMED
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
            .collect();
        f.write_str(&names.join("|"))
    }
}

impl TryFrom<String> for HandFlags {
    type Error = ParseFlagsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<HandFlags> for String {
    fn from(flags: HandFlags) -> String {
        flags.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
