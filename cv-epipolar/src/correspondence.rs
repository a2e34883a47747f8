use crate::{DepthRange, EpipolarError, Result, ViewParameters};
use nalgebra::{Matrix4, Point2, Vector4};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A normalized depth in `[0, 1]`, in the convention of [`crate::projection_matrix`]:
/// `1.0` is the near plane and `0.0` is the far plane.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-serialize", serde(try_from = "f64"))]
pub struct DepthFraction(f64);

impl TryFrom<f64> for DepthFraction {
    type Error = EpipolarError;

    fn try_from(fraction: f64) -> Result<Self> {
        Self::new(fraction)
    }
}

impl DepthFraction {
    pub const NEAR: Self = Self(1.0);
    pub const FAR: Self = Self(0.0);

    /// Fails with [`EpipolarError::InvalidDepthFraction`] outside of `[0, 1]`.
    pub fn new(fraction: f64) -> Result<Self> {
        if (0.0..=1.0).contains(&fraction) {
            Ok(Self(fraction))
        } else {
            Err(EpipolarError::InvalidDepthFraction(fraction))
        }
    }

    /// The fraction at which a point `depth` in front of the camera is seen.
    pub fn from_depth(range: &DepthRange, depth: f64) -> Result<Self> {
        Self::new(range.fraction_at(depth))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// The depth along the optical axis this fraction stands for.
    pub fn depth(self, range: &DepthRange) -> f64 {
        range.depth_at(self.0)
    }
}

/// The 4x4 map from `(x, y, depth fraction, 1)` in the left view to homogeneous
/// `(x, y, depth fraction, 1)` in the right view:
///
/// `H = P_r * Rt_r * inverse(Rt_l) * inverse(P_l)`
///
/// Fixing the depth fraction restricts it to the homography induced by the fronto-parallel
/// plane at that depth in front of the left camera.
pub fn plane_homography(left: &ViewParameters, right: &ViewParameters) -> Result<Matrix4<f64>> {
    let left_projection_inverse = left
        .projection()
        .try_inverse()
        .ok_or(EpipolarError::SingularMatrix {
            matrix: "left projection",
        })?;
    let left_pose_inverse = left.pose.inverse()?;
    Ok(right.projection() * right.pose.homogeneous() * left_pose_inverse * left_projection_inverse)
}

/// Maps a homogeneous point through `homography` and divides out the last coordinate.
pub fn apply_homography(homography: &Matrix4<f64>, point: Vector4<f64>) -> Result<Point2<f64>> {
    let mapped = homography * point;
    let w = mapped.w;
    // Also rejects NaN.
    if !(w.abs() > f64::EPSILON * mapped.xyz().norm()) {
        return Err(EpipolarError::DegenerateProjection);
    }
    let result = Point2::new(mapped.x / w, mapped.y / w);
    if !(result.x.is_finite() && result.y.is_finite()) {
        return Err(EpipolarError::DegenerateProjection);
    }
    Ok(result)
}

/// The pixel in the right view that sees the same 3d point as `point` in the left view,
/// assuming that point lies at the normalized depth `depth`.
///
/// Fails with [`EpipolarError::DegenerateProjection`] when the 3d point lies in the plane of
/// the right camera's optical center.
///
/// ```
/// use cv_epipolar::nalgebra::{Point2, Vector3};
/// use cv_epipolar::{corresponding_point, CameraIntrinsics, CameraPose, DepthFraction, DepthRange, ViewParameters};
///
/// let intrinsics = CameraIntrinsics::identity()
///     .focal(1000.0)
///     .principal_point(Point2::new(320.0, 240.0));
/// let range = DepthRange::new(1.0, 100.0).unwrap();
/// let left = ViewParameters::new(intrinsics, CameraPose::identity(), 640.0, 480.0, range);
/// let right = ViewParameters::new(
///     intrinsics,
///     CameraPose::from_translation(Vector3::new(-0.1, 0.0, 0.0)),
///     640.0,
///     480.0,
///     range,
/// );
///
/// // A point on the near plane (depth 1) shifts by focal * baseline / depth = 100 pixels.
/// let near = corresponding_point(&left, &right, Point2::new(320.0, 240.0), DepthFraction::NEAR).unwrap();
/// assert!((near.x - 220.0).abs() < 1e-9);
/// // On the far plane (depth 100) the disparity is only one pixel.
/// let far = corresponding_point(&left, &right, Point2::new(320.0, 240.0), DepthFraction::FAR).unwrap();
/// assert!((far.x - 319.0).abs() < 1e-9);
/// ```
pub fn corresponding_point(
    left: &ViewParameters,
    right: &ViewParameters,
    point: Point2<f64>,
    depth: DepthFraction,
) -> Result<Point2<f64>> {
    let homography = plane_homography(left, right)?;
    apply_homography(&homography, Vector4::new(point.x, point.y, depth.0, 1.0))
}
