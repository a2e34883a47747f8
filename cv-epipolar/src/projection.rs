use crate::{EpipolarError, Result};
use nalgebra::{Matrix3, Matrix4};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The interval of depths, along the optical axis, that the depth coordinate of a
/// projection matrix is normalized to.
///
/// Always satisfies `far > near > 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-serialize", serde(try_from = "RawDepthRange"))]
pub struct DepthRange {
    near: f64,
    far: f64,
}

/// The unchecked form a [`DepthRange`] is deserialized from.
#[cfg(feature = "serde-serialize")]
#[derive(Deserialize)]
struct RawDepthRange {
    near: f64,
    far: f64,
}

#[cfg(feature = "serde-serialize")]
impl TryFrom<RawDepthRange> for DepthRange {
    type Error = EpipolarError;

    fn try_from(raw: RawDepthRange) -> Result<Self> {
        Self::new(raw.near, raw.far)
    }
}

impl DepthRange {
    /// Fails with [`EpipolarError::InvalidDepthRange`] unless `far > near > 0`.
    pub fn new(near: f64, far: f64) -> Result<Self> {
        if near.is_finite() && far.is_finite() && near > 0.0 && far > near {
            Ok(Self { near, far })
        } else {
            Err(EpipolarError::InvalidDepthRange { near, far })
        }
    }

    pub fn near(&self) -> f64 {
        self.near
    }

    pub fn far(&self) -> f64 {
        self.far
    }

    /// The depth at which the normalized depth coordinate of [`projection_matrix`] equals
    /// `fraction`.
    ///
    /// The coordinate is `1.0` on the near plane and `0.0` on the far plane, and it is linear
    /// in inverse depth in between.
    ///
    /// ```
    /// use cv_epipolar::DepthRange;
    /// let range = DepthRange::new(1.0, 100.0).unwrap();
    /// assert_eq!(range.depth_at(1.0), 1.0);
    /// assert_eq!(range.depth_at(0.0), 100.0);
    /// ```
    pub fn depth_at(&self, fraction: f64) -> f64 {
        self.far * self.near / (fraction * (self.far - self.near) + self.near)
    }

    /// The inverse of [`DepthRange::depth_at`].
    pub fn fraction_at(&self, depth: f64) -> f64 {
        (self.far * self.near / depth - self.near) / (self.far - self.near)
    }
}

/// Builds the perspective projection matrix of intrinsics `K` over a depth range.
///
/// ```text
/// [[K00, 0,   K02,                0                   ],
///  [0,   K11, K12,                0                   ],
///  [0,   0,   -near/(far-near),   far*near/(far-near) ],
///  [0,   0,   1,                  0                   ]]
/// ```
///
/// A camera point at depth `z` maps to pixel coordinates in its first two components after
/// the divide by `z`, and to [`DepthRange::fraction_at`] of `z` in the third. The skew of `K`
/// is not represented.
#[rustfmt::skip]
pub fn projection_matrix(intrinsics: &Matrix3<f64>, range: &DepthRange) -> Matrix4<f64> {
    let k = intrinsics;
    let (near, far) = (range.near, range.far);
    let depth = far - near;
    Matrix4::new(
        k[(0, 0)], 0.0,       k[(0, 2)],      0.0,
        0.0,       k[(1, 1)], k[(1, 2)],      0.0,
        0.0,       0.0,       -near / depth,  far * near / depth,
        0.0,       0.0,       1.0,            0.0,
    )
}

/// [`projection_matrix`] taking the raw depth bounds.
///
/// Fails with [`EpipolarError::InvalidDepthRange`] unless `far > near > 0`.
///
/// ```
/// use cv_epipolar::compute_projection_matrix;
/// use cv_epipolar::nalgebra::Matrix3;
/// let k = Matrix3::new(1000.0, 0.0, 320.0, 0.0, 1000.0, 240.0, 0.0, 0.0, 1.0);
/// let projection = compute_projection_matrix(&k, 1.0, 100.0).unwrap();
/// assert_eq!(projection[(2, 2)], -1.0 / 99.0);
/// assert!(compute_projection_matrix(&k, 100.0, 1.0).is_err());
/// ```
pub fn compute_projection_matrix(
    intrinsics: &Matrix3<f64>,
    near: f64,
    far: f64,
) -> Result<Matrix4<f64>> {
    Ok(projection_matrix(intrinsics, &DepthRange::new(near, far)?))
}
