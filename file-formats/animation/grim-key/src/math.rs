use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// An orientation angle in degrees.
///
/// KEY animation data stores pitch/yaw/roll as plain degree values with no
/// canonical range, so two poses that look identical on screen can differ by
/// full turns. `normalized` maps an angle into a chosen 360-degree window,
/// which is what lets the blender accumulate shortest-path deltas instead of
/// spinning joints the long way around.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct Angle(f32);

impl Angle {
    pub const ZERO: Self = Self(0.0);

    /// Create an angle from a degree value
    pub fn from_degrees(degrees: f32) -> Self {
        Self(degrees)
    }

    /// The raw degree value, unnormalized
    pub fn degrees(self) -> f32 {
        self.0
    }

    /// Map this angle into the half-open range `[low, low + 360)`.
    ///
    /// `normalized(-180.0)` yields the signed shortest-arc representation
    /// used when accumulating pose deltas.
    pub fn normalized(self, low: f32) -> Self {
        Self((self.0 - low).rem_euclid(360.0) + low)
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.0)
    }
}

impl Add for Angle {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Angle {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Angle {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Angle {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Mul<f32> for Angle {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self(self.0 * rhs)
    }
}

impl Neg for Angle {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}
