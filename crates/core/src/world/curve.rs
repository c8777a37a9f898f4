use crate::{geo::Coordinates, Meter};
use anyhow::ensure;
use nalgebra::Vector3;
use std::iter::FusedIterator;

/// A Bézier curve on the sphere. The curve is evaluated in 3D space between
/// the control points, then projected back onto the sphere, so it always
/// stays on the surface. Used to smooth a road's vertex chain into a curve.
#[derive(Clone, Debug, PartialEq)]
pub struct BezierCurve {
    points: Vec<Coordinates>,
    /// Angular length of the control polygon, an upper bound on the length
    /// of the curve itself
    length: f64,
}

impl BezierCurve {
    /// Create a curve from its control points. The curve starts at the first
    /// point and ends at the last. Needs at least two points.
    pub fn new(points: Vec<Coordinates>) -> anyhow::Result<Self> {
        ensure!(
            points.len() >= 2,
            "bezier curve needs at least 2 points, got {}",
            points.len()
        );
        let length = points.windows(2).map(|w| w[0].angle_to(&w[1])).sum();
        Ok(Self { points, length })
    }

    pub fn points(&self) -> &[Coordinates] {
        &self.points
    }

    /// Angular length of the control polygon, in radians
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Point on the curve at `t`, which is clamped to `[0, 1]`
    pub fn eval(&self, t: f64) -> Coordinates {
        let t = t.clamp(0.0, 1.0);
        // De Casteljau: repeatedly lerp adjacent points until one is left
        let mut scratch: Vec<Vector3<f64>> =
            self.points.iter().map(|point| *point.vector()).collect();
        for len in (1..scratch.len()).rev() {
            for i in 0..len {
                scratch[i] = scratch[i].lerp(&scratch[i + 1], t);
            }
        }
        Coordinates::from_vector(scratch[0])
    }

    /// Sample the curve at points roughly `spacing` apart on a planet of the
    /// given radius. The first point is the start of the curve and the last
    /// is exactly the end.
    pub fn rasterize(
        &self,
        spacing: Meter,
        radius: Meter,
    ) -> anyhow::Result<Rasterize<'_>> {
        ensure!(
            spacing > Meter(0.0),
            "rasterize spacing must be positive, got {}",
            spacing
        );
        let physical_length = radius * self.length;
        let step = if physical_length > Meter(0.0) {
            (spacing / physical_length.0).0
        } else {
            // Degenerate curve, only the two ends are worth sampling
            1.0
        };
        Ok(Rasterize {
            curve: self,
            step,
            index: 0,
            done: false,
        })
    }
}

/// Evenly spaced points along a [BezierCurve]. See
/// [BezierCurve::rasterize].
#[derive(Clone, Debug)]
pub struct Rasterize<'a> {
    curve: &'a BezierCurve,
    /// Parameter step between samples
    step: f64,
    index: usize,
    done: bool,
}

impl<'a> Iterator for Rasterize<'a> {
    type Item = Coordinates;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let t = self.index as f64 * self.step;
        self.index += 1;
        if t < 1.0 {
            Some(self.curve.eval(t))
        } else {
            self.done = true;
            Some(self.curve.eval(1.0))
        }
    }
}

impl<'a> FusedIterator for Rasterize<'a> {}
