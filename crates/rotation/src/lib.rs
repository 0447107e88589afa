//! Unit-quaternion algebra over axis-angle (rotation vector) inputs.
//!
//! A rotation vector is a 3-component vector whose direction is the rotation
//! axis and whose magnitude is the rotation angle in radians. Everything here
//! is a pure function over fixed-size arrays; callers own validation policy
//! beyond finiteness.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotationError {
    NonFiniteComponent,
    ZeroOrNonFiniteNorm,
}

impl fmt::Display for RotationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFiniteComponent => write!(f, "rotation vector has a non-finite component"),
            Self::ZeroOrNonFiniteNorm => write!(f, "quaternion norm is zero or non-finite"),
        }
    }
}

impl std::error::Error for RotationError {}

/// Unit quaternion, scalar-first.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quat {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quat {
    pub const IDENTITY: Quat = Quat {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Converts an axis-angle rotation vector to a unit quaternion.
    ///
    /// The zero vector maps to the identity rotation. Small angles stay
    /// finite: `sin(θ/2)/θ` approaches 0.5 as θ approaches zero, so the only
    /// branch needed is exact zero.
    pub fn from_rotvec(rotvec: [f64; 3]) -> Result<Quat, RotationError> {
        if rotvec.iter().any(|v| !v.is_finite()) {
            return Err(RotationError::NonFiniteComponent);
        }
        let angle = norm3(&rotvec);
        if angle == 0.0 {
            return Ok(Quat::IDENTITY);
        }
        let half = 0.5 * angle;
        let scale = half.sin() / angle;
        Ok(Quat {
            w: half.cos(),
            x: rotvec[0] * scale,
            y: rotvec[1] * scale,
            z: rotvec[2] * scale,
        })
    }

    /// Hamilton product; `a.mul(b)` is the rotation b followed by a.
    pub fn mul(self, rhs: Quat) -> Quat {
        Quat {
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        }
    }

    /// Conjugate; the inverse for unit quaternions.
    pub fn conjugate(self) -> Quat {
        Quat {
            w: self.w,
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }

    pub fn norm(self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn normalize(self) -> Result<Quat, RotationError> {
        let n = self.norm();
        if !n.is_finite() || n == 0.0 {
            return Err(RotationError::ZeroOrNonFiniteNorm);
        }
        let inv = 1.0 / n;
        Ok(Quat {
            w: self.w * inv,
            x: self.x * inv,
            y: self.y * inv,
            z: self.z * inv,
        })
    }

    /// Rotation angle magnitude in `[0, π]`.
    ///
    /// `|w|` selects the shorter of the two quaternion covers, so q and -q
    /// report the same angle.
    pub fn angle(self) -> f64 {
        let vec_norm = norm3(&[self.x, self.y, self.z]);
        2.0 * vec_norm.atan2(self.w.abs())
    }
}

/// Angle of the relative rotation carrying `from` onto `to`, in `[0, π]`.
pub fn relative_angle(from: Quat, to: Quat) -> f64 {
    to.mul(from.conjugate()).angle()
}

#[inline]
fn norm3(v: &[f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rotvec_is_identity() {
        let q = Quat::from_rotvec([0.0, 0.0, 0.0]).expect("zero rotvec");
        assert_eq!(q, Quat::IDENTITY);
        assert_eq!(q.angle(), 0.0);
    }

    #[test]
    fn non_finite_rotvec_is_rejected() {
        assert_eq!(
            Quat::from_rotvec([f64::NAN, 0.0, 0.0]),
            Err(RotationError::NonFiniteComponent)
        );
        assert_eq!(
            Quat::from_rotvec([0.0, f64::INFINITY, 0.0]),
            Err(RotationError::NonFiniteComponent)
        );
    }

    #[test]
    fn normalize_rejects_zero() {
        let zero = Quat {
            w: 0.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        };
        assert_eq!(zero.normalize(), Err(RotationError::ZeroOrNonFiniteNorm));
    }
}
