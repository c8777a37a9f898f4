//! Points on the unit sphere. Every position in a planet (mesh vertices,
//! tile centers and corners, road samples) is a [Coordinates], and physical
//! distances are derived by scaling angular distances by the planet radius.

use crate::Meter;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::{f64::consts::PI, fmt};

/// A point on the unit sphere. The constructor always re-projects its input
/// onto the sphere, so `vector().norm()` is 1 within floating tolerance.
///
/// Axes follow the convention latitude = `asin(y)`, longitude =
/// `atan2(z, x)`, i.e. `y` points at the north pole.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates(Vector3<f64>);

impl Coordinates {
    /// Create a point from any non-zero vector, which will be normalized
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self::from_vector(Vector3::new(x, y, z))
    }

    /// Project a non-zero vector onto the unit sphere
    pub fn from_vector(vector: Vector3<f64>) -> Self {
        debug_assert!(
            vector.norm_squared() > 0.0,
            "cannot project zero vector onto the sphere"
        );
        Self(vector.normalize())
    }

    /// Create a point from latitude and longitude, both in radians.
    /// Longitude is wrapped into `[-π, π]`.
    pub fn from_lat_lon(latitude: f64, longitude: f64) -> Self {
        let mut longitude = longitude;
        while longitude > PI {
            longitude -= 2.0 * PI;
        }
        while longitude < -PI {
            longitude += 2.0 * PI;
        }
        Self(Vector3::new(
            longitude.cos() * latitude.cos(),
            latitude.sin(),
            longitude.sin() * latitude.cos(),
        ))
    }

    /// The underlying unit vector. This doubles as the outward normal of the
    /// sphere at this point.
    pub fn vector(&self) -> &Vector3<f64> {
        &self.0
    }

    pub fn x(&self) -> f64 {
        self.0.x
    }

    pub fn y(&self) -> f64 {
        self.0.y
    }

    pub fn z(&self) -> f64 {
        self.0.z
    }

    /// Latitude in radians, in `[-π/2, π/2]`
    pub fn latitude(&self) -> f64 {
        self.0.y.clamp(-1.0, 1.0).asin()
    }

    /// Longitude in radians, in `[-π, π]`
    pub fn longitude(&self) -> f64 {
        let longitude = self.0.z.atan2(self.0.x);
        // Exactly at a pole, the longitude is meaningless
        if longitude.is_nan() {
            0.0
        } else {
            longitude
        }
    }

    /// Great-circle angle between two points, in radians. Uses `atan2` of
    /// the cross and dot products rather than `acos`, which loses all
    /// precision for nearby points.
    pub fn angle_to(&self, other: &Self) -> f64 {
        self.0.cross(&other.0).norm().atan2(self.0.dot(&other.0))
    }

    /// Physical great-circle distance between two points on a planet of the
    /// given radius
    pub fn distance_to(&self, other: &Self, radius: Meter) -> Meter {
        radius * self.angle_to(other)
    }

    /// Weighted sum of several points, projected back onto the sphere. The
    /// weights don't need to sum to 1.
    pub fn linear_combination(terms: &[(f64, Self)]) -> Self {
        let sum = terms
            .iter()
            .fold(Vector3::zeros(), |acc, (weight, point)| {
                acc + point.0 * *weight
            });
        Self::from_vector(sum)
    }

    /// The point halfway along the great circle between two points. This
    /// is symmetric: `a.midpoint(b) == b.midpoint(a)`.
    pub fn midpoint(&self, other: &Self) -> Self {
        Self::from_vector(self.0 + other.0)
    }

    /// Signed angle from `self` to `other`, rotating around `axis`. Both
    /// points are first projected onto the plane perpendicular to the axis.
    /// The result is in `(-π, π]`, positive for counter-clockwise rotation
    /// when looking down the axis toward the origin.
    pub fn angle_around(&self, other: &Self, axis: &Self) -> f64 {
        let axis = axis.0;
        let u1 = self.0 - axis * axis.dot(&self.0);
        let u2 = other.0 - axis * axis.dot(&other.0);
        axis.dot(&u1.cross(&u2)).atan2(u1.dot(&u2))
    }
}

impl From<Vector3<f64>> for Coordinates {
    fn from(vector: Vector3<f64>) -> Self {
        Self::from_vector(vector)
    }
}

/// Degrees/minutes/seconds with hemisphere letters, e.g. `12°4'33"N 1°0'0"W`
impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Round to the nearest whole second first, so float noise can't
        // turn 30' into 29'59"
        fn dms(radians: f64) -> (u64, u64, u64) {
            let seconds = (radians.abs().to_degrees() * 3600.0).round() as u64;
            (seconds / 3600, (seconds / 60) % 60, seconds % 60)
        }

        let latitude = self.latitude();
        let longitude = self.longitude();
        let (lat_d, lat_m, lat_s) = dms(latitude);
        let (lon_d, lon_m, lon_s) = dms(longitude);
        write!(
            f,
            "{}°{}'{}\"{} {}°{}'{}\"{}",
            lat_d,
            lat_m,
            lat_s,
            if latitude > 0.0 { 'N' } else { 'S' },
            lon_d,
            lon_m,
            lon_s,
            if longitude > 0.0 { 'E' } else { 'W' },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_normalizes() {
        let point = Coordinates::new(3.0, 0.0, 4.0);
        assert_approx_eq!(point.vector().norm(), 1.0);
        assert_approx_eq!(point.x(), 0.6);
        assert_approx_eq!(point.z(), 0.8);
    }

    #[test]
    fn test_lat_lon_round_trip() {
        let point = Coordinates::from_lat_lon(0.5, -2.0);
        assert_approx_eq!(point.latitude(), 0.5);
        assert_approx_eq!(point.longitude(), -2.0);

        // Longitude gets wrapped
        let point = Coordinates::from_lat_lon(0.1, 3.0 * PI);
        assert_approx_eq!(point.longitude().abs(), PI);

        let north = Coordinates::new(0.0, 1.0, 0.0);
        assert_approx_eq!(north.latitude(), FRAC_PI_2);
    }

    #[test]
    fn test_distance() {
        let a = Coordinates::new(1.0, 0.0, 0.0);
        let b = Coordinates::new(0.0, 1.0, 0.0);
        assert_approx_eq!(a.angle_to(&b), FRAC_PI_2);
        assert_approx_eq!(a.angle_to(&a), 0.0);
        assert_approx_eq!(a.distance_to(&b, Meter(2.0)).0, PI);
    }

    #[test]
    fn test_midpoint_symmetric() {
        let a = Coordinates::new(1.0, 0.2, 0.0);
        let b = Coordinates::new(0.0, 0.3, 1.0);
        assert_eq!(a.midpoint(&b), b.midpoint(&a));
        assert_approx_eq!(a.midpoint(&b).angle_to(&a), a.angle_to(&b) / 2.0);
    }

    #[test]
    fn test_angle_around() {
        let axis = Coordinates::new(0.0, 1.0, 0.0);
        let x = Coordinates::new(1.0, 0.1, 0.0);
        let z = Coordinates::new(0.0, 0.1, 1.0);
        // Looking down +y, rotating x toward z is clockwise
        assert_approx_eq!(x.angle_around(&z, &axis), -FRAC_PI_2);
        assert_approx_eq!(z.angle_around(&x, &axis), FRAC_PI_2);
        assert_approx_eq!(x.angle_around(&x, &axis), 0.0);
    }

    #[test]
    fn test_display() {
        let point = Coordinates::from_lat_lon(
            (10.0f64 + 30.0 / 60.0).to_radians(),
            -(20.0f64).to_radians(),
        );
        assert_eq!(point.to_string(), "10°30'0\"N 20°0'0\"W");
    }
}
