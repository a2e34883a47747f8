use crate::{
    apply_homography, corresponding_point, plane_homography, DepthFraction, EpipolarError,
    EpipolarLine, EssentialMatrix, FundamentalMatrix, LineSegment, Result, ViewParameters,
};
use nalgebra::{Point2, Vector4};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Optical centers closer than this, relative to the scale of the pose translations, are
/// considered to coincide.
pub const COINCIDENT_CENTER_EPSILON: f64 = 1e-12;

/// Two views of the same scene. Pixels are picked in the `left` view and matched in the
/// `right` view.
///
/// Nothing is cached: every method recomputes what it needs from the two views.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct StereoPair {
    pub left: ViewParameters,
    pub right: ViewParameters,
}

impl StereoPair {
    pub fn new(left: ViewParameters, right: ViewParameters) -> Self {
        Self { left, right }
    }

    /// The same pair with pixels picked in the right view instead.
    pub fn swapped(&self) -> Self {
        Self {
            left: self.right,
            right: self.left,
        }
    }

    /// Distance between the two optical centers.
    pub fn baseline(&self) -> Result<f64> {
        let relative = self.left.pose.relative_to(&self.right.pose)?;
        Ok(relative.fixed_slice::<3, 1>(0, 3).norm())
    }

    /// Whether both views share an optical center, in which case there is no epipolar
    /// geometry: the essential matrix vanishes and every epipolar line collapses onto the
    /// picked point itself.
    pub fn has_coincident_centers(&self) -> Result<bool> {
        let scale = self
            .left
            .pose
            .translation()
            .norm()
            .max(self.right.pose.translation().norm())
            .max(1.0);
        Ok(self.baseline()? <= COINCIDENT_CENTER_EPSILON * scale)
    }

    pub fn essential(&self) -> Result<EssentialMatrix> {
        EssentialMatrix::from_poses(&self.left.pose, &self.right.pose)
    }

    pub fn fundamental(&self) -> Result<FundamentalMatrix> {
        FundamentalMatrix::from_essential(
            &self.left.intrinsic_matrix(),
            &self.right.intrinsic_matrix(),
            &self.essential()?,
        )
    }

    /// The epipolar line in the right view of the left pixel `point`.
    ///
    /// Fails with [`EpipolarError::DegenerateEpipolarLine`] for views with coincident
    /// optical centers. The pixel is not checked against the bounds of the left image.
    pub fn epipolar_line(&self, point: Point2<f64>) -> Result<EpipolarLine> {
        if self.has_coincident_centers()? {
            log::debug!("views share an optical center, no epipolar line for {}", point);
            return Err(EpipolarError::DegenerateEpipolarLine);
        }
        let line = self.fundamental()?.epipolar_line(point);
        if line.is_degenerate() {
            return Err(EpipolarError::DegenerateEpipolarLine);
        }
        Ok(line)
    }

    /// The epipolar line of `point` clipped to the width of the right image.
    ///
    /// See [`EpipolarLine::segment`].
    pub fn epipolar_segment(&self, point: Point2<f64>) -> Result<LineSegment> {
        self.epipolar_line(point)?
            .segment(self.right.width, self.right.height)
    }

    /// See [`corresponding_point`].
    pub fn corresponding_point(
        &self,
        point: Point2<f64>,
        depth: DepthFraction,
    ) -> Result<Point2<f64>> {
        corresponding_point(&self.left, &self.right, point, depth)
    }

    /// Sweeps the depth fraction over `steps + 1` evenly spaced values from the far plane
    /// (`0`) to the near plane (`1`) and returns the matching right pixel for each.
    ///
    /// With `steps == 0` only the far plane is sampled. Depths whose projection is degenerate
    /// are left out.
    ///
    /// ```
    /// use cv_epipolar::nalgebra::{Point2, Vector3};
    /// use cv_epipolar::{CameraIntrinsics, CameraPose, DepthRange, StereoPair, ViewParameters};
    ///
    /// let intrinsics = CameraIntrinsics::identity().focal(500.0);
    /// let range = DepthRange::new(1.0, 10.0).unwrap();
    /// let pair = StereoPair::new(
    ///     ViewParameters::new(intrinsics, CameraPose::identity(), 640.0, 480.0, range),
    ///     ViewParameters::new(
    ///         intrinsics,
    ///         CameraPose::from_translation(Vector3::new(0.0, 0.2, 0.0)),
    ///         640.0,
    ///         480.0,
    ///         range,
    ///     ),
    /// );
    /// let sweep = pair.corresponding_points(Point2::new(100.0, 100.0), 10).unwrap();
    /// assert_eq!(sweep.len(), 11);
    /// // Nearer points have a larger disparity.
    /// assert!(sweep.windows(2).all(|w| w[1].1.y > w[0].1.y));
    /// ```
    pub fn corresponding_points(
        &self,
        point: Point2<f64>,
        steps: usize,
    ) -> Result<Vec<(DepthFraction, Point2<f64>)>> {
        let homography = plane_homography(&self.left, &self.right)?;
        let mut points = Vec::with_capacity(steps + 1);
        for step in 0..=steps {
            let depth = if steps == 0 {
                DepthFraction::FAR
            } else {
                DepthFraction::new(step as f64 / steps as f64)?
            };
            let homogeneous = Vector4::new(point.x, point.y, depth.value(), 1.0);
            match apply_homography(&homography, homogeneous) {
                Ok(found) => points.push((depth, found)),
                Err(EpipolarError::DegenerateProjection) => {
                    log::warn!(
                        "skipping depth fraction {} of {}: degenerate projection",
                        depth.value(),
                        point
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(points)
    }
}
