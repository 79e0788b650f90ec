//! # Geometry Helpers
//!
//! Curve sampling and angle math shared by the range cache and the sign resolver.
//!
//! Conventions used throughout the crate:
//! - The ground plane is XZ; "planar" vectors are `Vec2(x, z)`.
//! - Bearings are degrees in `[0, 360)`, measured from +Z towards +X.
//! - The right-hand normal of a planar direction `(x, z)` is `(z, -x)`.

use crate::primitives::{CURVE_SEARCH_REFINEMENTS, CURVE_SEARCH_SAMPLES};
use glam::{EulerRot, Quat, Vec2, Vec3};

/// A cubic Bezier curve in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bezier {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
    pub d: Vec3,
}

impl Bezier {
    #[must_use]
    pub const fn new(a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> Self {
        Self { a, b, c, d }
    }

    /// A straight segment with evenly spaced control points.
    #[must_use]
    pub fn line(start: Vec3, end: Vec3) -> Self {
        Self {
            a: start,
            b: start.lerp(end, 1.0 / 3.0),
            c: start.lerp(end, 2.0 / 3.0),
            d: end,
        }
    }

    /// Point on the curve at parameter `t`.
    #[inline]
    #[must_use]
    pub fn position(&self, t: f32) -> Vec3 {
        let u = 1.0 - t;
        self.a * (u * u * u) + self.b * (3.0 * u * u * t) + self.c * (3.0 * u * t * t)
            + self.d * (t * t * t)
    }

    /// First derivative of the curve at parameter `t`.
    #[inline]
    #[must_use]
    pub fn tangent(&self, t: f32) -> Vec3 {
        let u = 1.0 - t;
        (self.b - self.a) * (3.0 * u * u)
            + (self.c - self.b) * (6.0 * u * t)
            + (self.d - self.c) * (3.0 * t * t)
    }

    #[must_use]
    pub fn midpoint(&self) -> Vec3 {
        self.position(0.5)
    }

    /// Closest point of the curve's ground projection to `point`.
    ///
    /// Returns `(distance, t)`. Uniform sampling picks the basin, then a
    /// shrinking local search refines `t`.
    #[must_use]
    pub fn closest_planar(&self, point: Vec2) -> (f32, f32) {
        let dist = |t: f32| planar(self.position(t)).distance_squared(point);

        let mut best_t = 0.0;
        let mut best = dist(0.0);
        for i in 1..=CURVE_SEARCH_SAMPLES {
            let t = i as f32 / CURVE_SEARCH_SAMPLES as f32;
            let d = dist(t);
            if d < best {
                best = d;
                best_t = t;
            }
        }

        let mut step = 1.0 / CURVE_SEARCH_SAMPLES as f32;
        for _ in 0..CURVE_SEARCH_REFINEMENTS {
            step *= 0.5;
            for candidate in [best_t - step, best_t + step] {
                let candidate = candidate.clamp(0.0, 1.0);
                let d = dist(candidate);
                if d < best {
                    best = d;
                    best_t = candidate;
                }
            }
        }

        (best.sqrt(), best_t)
    }
}

/// Project a world position onto the ground plane.
#[inline]
#[must_use]
pub fn planar(v: Vec3) -> Vec2 {
    Vec2::new(v.x, v.z)
}

/// Right-hand normal of a planar direction.
#[inline]
#[must_use]
pub fn right(v: Vec2) -> Vec2 {
    Vec2::new(v.y, -v.x)
}

/// Bearing in degrees of `to` as seen from `from`.
#[must_use]
pub fn bearing_to_point(from: Vec2, to: Vec2) -> f32 {
    let delta = to - from;
    delta.x.atan2(delta.y).to_degrees().rem_euclid(360.0)
}

/// Convert a 16-bit turn fraction into degrees.
#[inline]
#[must_use]
pub fn azimuth_to_degrees(azimuth: u16) -> f32 {
    f32::from(azimuth) / 65536.0 * 360.0
}

/// Inverse of [`azimuth_to_degrees`], rounding to the nearest representable fraction.
#[must_use]
pub fn degrees_to_azimuth(degrees: f32) -> u16 {
    let turns = degrees.rem_euclid(360.0) / 360.0;
    ((turns * 65536.0).round() as u32 % 65536) as u16
}

/// Smallest absolute difference between two bearings, in `[0, 180]`.
#[must_use]
pub fn bearing_difference(a: f32, b: f32) -> f32 {
    let diff = (a - b).abs().rem_euclid(360.0);
    if diff > 180.0 { 360.0 - diff } else { diff }
}

/// Heading of a rotation around the vertical axis, in degrees `[0, 360)`.
#[must_use]
pub fn yaw_degrees(rotation: Quat) -> f32 {
    let (yaw, _, _) = rotation.to_euler(EulerRot::YXZ);
    yaw.to_degrees().rem_euclid(360.0)
}

/// Whether `point` lies on the right-hand side of `curve` at parameter `t`.
///
/// The right-hand side is the odd-numbered side of the street.
#[must_use]
pub fn is_odd_side(point: Vec3, curve: &Bezier, t: f32) -> bool {
    let offset = planar(point) - planar(curve.position(t));
    let normal = right(planar(curve.tangent(t)));
    offset.dot(normal) > 0.0
}

/// Vector from `origin` to `target` expressed in the local frame of `rotation`,
/// flattened onto the ground plane.
#[must_use]
pub fn local_planar_offset(origin: Vec3, rotation: Quat, target: Vec3) -> Vec3 {
    let local = rotation.inverse() * (target - origin);
    Vec3::new(local.x, 0.0, local.z)
}

// =============================================================================
// TESTS
// =============================================================================
