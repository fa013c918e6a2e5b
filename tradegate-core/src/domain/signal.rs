//! Signals — per-bar directional intent produced by strategies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a signal: short, flat, or long.
///
/// Serialized as the integers `-1`, `0`, `+1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Direction {
    Short,
    Flat,
    Long,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Self::Short => -1.0,
            Self::Flat => 0.0,
            Self::Long => 1.0,
        }
    }

    pub fn is_flat(self) -> bool {
        self == Self::Flat
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Short => Self::Long,
            Self::Flat => Self::Flat,
            Self::Long => Self::Short,
        }
    }

    /// Direction of a real number's sign; exactly zero (or NaN) is flat.
    pub fn from_sign(value: f64) -> Self {
        if value > 0.0 {
            Self::Long
        } else if value < 0.0 {
            Self::Short
        } else {
            Self::Flat
        }
    }

    /// The trade side this direction opens, if any.
    pub fn side(self) -> Option<Side> {
        match self {
            Self::Short => Some(Side::Short),
            Self::Flat => None,
            Self::Long => Some(Side::Long),
        }
    }
}

impl TryFrom<i8> for Direction {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Short),
            0 => Ok(Self::Flat),
            1 => Ok(Self::Long),
            other => Err(format!("signal direction must be -1, 0 or 1, got {other}")),
        }
    }
}

impl From<Direction> for i8 {
    fn from(d: Direction) -> i8 {
        match d {
            Direction::Short => -1,
            Direction::Flat => 0,
            Direction::Long => 1,
        }
    }
}

/// Side of an open or closed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn sign(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Self::Long => Direction::Long,
            Self::Short => Direction::Short,
        }
    }
}

/// A signal aligned to a bar timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    /// Conviction in [0, 1].
    pub strength: f64,
}

impl Signal {
    pub fn new(timestamp: DateTime<Utc>, direction: Direction, strength: f64) -> Self {
        Self {
            timestamp,
            direction,
            strength: strength.clamp(0.0, 1.0),
        }
    }

    pub fn flat(timestamp: DateTime<Utc>) -> Self {
        Self::new(timestamp, Direction::Flat, 0.0)
    }
}
