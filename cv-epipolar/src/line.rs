use crate::{EpipolarError, Result};
use nalgebra::{Point2, Vector3};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Below this ratio of `hypot(a, b)` to `|(a, b, c)|` the coefficients do not describe a line.
pub const DEGENERATE_LINE_EPSILON: f64 = 1e-12;

/// Below this ratio of `|b|` to `hypot(a, b)` a line is treated as vertical and is
/// parametrized by `y` instead of `x`.
pub const VERTICAL_LINE_EPSILON: f64 = 1e-9;

/// A line `a·x + b·y + c = 0` in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct EpipolarLine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

/// A finite piece of a line between two pixel positions.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct LineSegment {
    pub start: Point2<f64>,
    pub end: Point2<f64>,
}

impl EpipolarLine {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    pub fn coefficients(&self) -> Vector3<f64> {
        Vector3::new(self.a, self.b, self.c)
    }

    /// Solves the line equation for `y`. Returns `None` for vertical lines.
    pub fn y_at(&self, x: f64) -> Option<f64> {
        if self.b == 0.0 {
            None
        } else {
            Some(-(self.a * x + self.c) / self.b)
        }
    }

    /// Solves the line equation for `x`. Returns `None` for horizontal lines.
    pub fn x_at(&self, y: f64) -> Option<f64> {
        if self.a == 0.0 {
            None
        } else {
            Some(-(self.b * y + self.c) / self.a)
        }
    }

    /// Whether the coefficients fail to describe a line.
    ///
    /// This happens when they are not finite, or when `a` and `b` both vanish. The latter is
    /// the case for a view pair that shares its optical center, where every point is its own
    /// epipole.
    pub fn is_degenerate(&self) -> bool {
        let coefficients = self.coefficients();
        if !coefficients.iter().all(|n| n.is_finite()) {
            return true;
        }
        let normal = self.a.hypot(self.b);
        normal == 0.0 || normal <= DEGENERATE_LINE_EPSILON * coefficients.norm()
    }

    /// Perpendicular distance in pixels from `point` to the line.
    pub fn distance(&self, point: Point2<f64>) -> f64 {
        (self.a * point.x + self.b * point.y + self.c).abs() / self.a.hypot(self.b)
    }

    /// Clips the line to the horizontal extent `[0, width]` of an image.
    ///
    /// The endpoints are the points of the line at `x = 0` and `x = width`. When the line is
    /// vertical this is not possible, so it is solved for `x` at `y = 0` and `y = height`
    /// instead. Degenerate coefficients give [`EpipolarError::DegenerateEpipolarLine`].
    ///
    /// ```
    /// use cv_epipolar::EpipolarLine;
    /// // y = 0.5·x + 10
    /// let line = EpipolarLine::new(0.5, -1.0, 10.0);
    /// let segment = line.segment(640.0, 480.0).unwrap();
    /// assert_eq!(segment.start.y, 10.0);
    /// assert_eq!(segment.end.y, 330.0);
    ///
    /// // x = 100
    /// let vertical = EpipolarLine::new(1.0, 0.0, -100.0);
    /// let segment = vertical.segment(640.0, 480.0).unwrap();
    /// assert_eq!((segment.start.x, segment.start.y), (100.0, 0.0));
    /// assert_eq!((segment.end.x, segment.end.y), (100.0, 480.0));
    /// ```
    pub fn segment(&self, width: f64, height: f64) -> Result<LineSegment> {
        if self.is_degenerate() {
            return Err(EpipolarError::DegenerateEpipolarLine);
        }
        if self.b.abs() <= VERTICAL_LINE_EPSILON * self.a.hypot(self.b) {
            log::debug!("epipolar line {:?} is vertical, solving for x", self);
            let x = |y: f64| -(self.b * y + self.c) / self.a;
            return Ok(LineSegment {
                start: Point2::new(x(0.0), 0.0),
                end: Point2::new(x(height), height),
            });
        }
        let y = |x: f64| -(self.a * x + self.c) / self.b;
        Ok(LineSegment {
            start: Point2::new(0.0, y(0.0)),
            end: Point2::new(width, y(width)),
        })
    }
}

impl LineSegment {
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }

    /// The line through both endpoints. Equal endpoints give a degenerate line.
    pub fn line(&self) -> EpipolarLine {
        let coefficients = self.start.to_homogeneous().cross(&self.end.to_homogeneous());
        EpipolarLine::new(coefficients.x, coefficients.y, coefficients.z)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_coefficients_are_degenerate() {
        let line = EpipolarLine::new(0.0, 0.0, 0.0);
        assert!(line.is_degenerate());
        assert!(matches!(
            line.segment(640.0, 480.0),
            Err(EpipolarError::DegenerateEpipolarLine)
        ));
    }

    #[test]
    fn line_at_infinity_is_degenerate() {
        assert!(EpipolarLine::new(0.0, 0.0, 1.0).is_degenerate());
        assert!(EpipolarLine::new(1e-20, 0.0, 1.0).is_degenerate());
    }

    #[test]
    fn nan_is_degenerate() {
        assert!(EpipolarLine::new(f64::NAN, 1.0, 0.0).is_degenerate());
    }

    #[test]
    fn distance_to_horizontal_line() {
        // y = 240
        let line = EpipolarLine::new(0.0, 2.0, -480.0);
        assert_eq!(line.distance(Point2::new(17.0, 250.0)), 10.0);
        assert_eq!(line.y_at(3.0), Some(240.0));
        assert_eq!(line.x_at(3.0), None);
    }

    #[test]
    fn segment_round_trips_through_line() {
        let line = EpipolarLine::new(0.3, -1.0, 25.0);
        let segment = line.segment(640.0, 480.0).unwrap();
        let recovered = segment.line();
        assert!(recovered.distance(Point2::new(100.0, 55.0)) < 1e-9);
        assert!((segment.length() - 640.0f64.hypot(192.0)).abs() < 1e-9);
    }
}
