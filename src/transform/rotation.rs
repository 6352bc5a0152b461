//! Page rotation in quarter turns.

use std::fmt;

use crate::error::{Error, Result};

/// A clockwise rotation of 0, 90, 180 or 270 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rotation(u16);

impl Rotation {
    /// No rotation.
    pub const NONE: Rotation = Rotation(0);

    /// Normalize `degrees` into a rotation.
    ///
    /// Any multiple of 90 is accepted; negative values turn counter-clockwise, so
    /// `-90` is the same as `270`.
    pub fn from_degrees(degrees: i64) -> Result<Self> {
        if degrees % 90 != 0 {
            return Err(Error::InvalidRotation(degrees));
        }
        Ok(Rotation(degrees.rem_euclid(360) as u16))
    }

    /// Degrees in `0..360`.
    pub fn degrees(self) -> i64 {
        i64::from(self.0)
    }

    /// Add this rotation to an existing `/Rotate` value, normalizing the result.
    pub fn apply_to(self, current: i64) -> i64 {
        (current.rem_euclid(360) + self.degrees()).rem_euclid(360)
    }
}

impl TryFrom<i64> for Rotation {
    type Error = Error;

    fn try_from(degrees: i64) -> Result<Self> {
        Rotation::from_degrees(degrees)
    }
}

impl std::ops::Add for Rotation {
    type Output = Rotation;

    fn add(self, other: Rotation) -> Rotation {
        Rotation(((self.degrees() + other.degrees()) % 360) as u16)
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.0)
    }
}
