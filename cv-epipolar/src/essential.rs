use crate::{CameraPose, NormalizedKeyPoint, Result};
use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use float_ord::FloatOrd;
use nalgebra::{Matrix3, Vector3};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// This stores an essential matrix, which is satisfied by the following constraint:
///
/// transpose(x_l) * E * x_r = 0
///
/// Where `x_l` and `x_r` are homogeneous normalized image coordinates in the left and
/// right camera. You can get a homogeneous normalized image coordinate by appending `1.0`
/// to a [`NormalizedKeyPoint`].
///
/// The essential matrix embodies the epipolar constraint between two images. Assuming a
/// pinhole camera model, the light source for any point on the sensor exists somewhere
/// along the ray out of the optical center through that point. Every point along that ray
/// projects onto a single line on the sensor of the other camera, the epipolar line.
/// `E * x_r` is the normal of the plane spanned by the ray of `x_r` and the baseline, in the
/// frame of the left camera, so every left bearing in that plane has a dot product of `0.0`
/// with it.
///
/// The essential matrix has rank 2 whenever the two optical centers differ. When the optical
/// centers coincide, the matrix is zero and there are no epipolar lines.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct EssentialMatrix(pub Matrix3<f64>);

impl EssentialMatrix {
    /// Builds `[t]ₓ · R` from the rotation and translation of a relative pose that maps
    /// right camera points into the left camera.
    pub fn from_relative(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Self {
        Self(translation.cross_matrix() * rotation)
    }

    /// Computes the essential matrix of two world-to-camera poses.
    ///
    /// The relative pose is `left · right⁻¹`. Its translation column `t` and rotation
    /// block `R` give `E = [t]ₓ · R`.
    ///
    /// ```
    /// use cv_epipolar::{CameraPose, EssentialMatrix};
    /// use cv_epipolar::nalgebra::{Rotation3, Vector3};
    /// let left = CameraPose::identity();
    /// let right = CameraPose::from_parts(
    ///     Vector3::new(-0.8, 0.4, 0.5),
    ///     Rotation3::from_euler_angles(0.2, 0.3, 0.4),
    /// );
    /// let essential = EssentialMatrix::from_poses(&left, &right).unwrap();
    /// assert_eq!(essential.rank(1e-9), 2);
    /// ```
    pub fn from_poses(left: &CameraPose, right: &CameraPose) -> Result<Self> {
        let relative = left.relative_to(right)?;
        let translation = relative.fixed_slice::<3, 1>(0, 3).into_owned();
        let rotation = relative.fixed_slice::<3, 3>(0, 0).into_owned();
        let essential = Self::from_relative(&rotation, &translation);
        log::trace!("essential matrix from poses: {:?}", essential.0);
        Ok(essential)
    }

    /// The singular values of the matrix, in no particular order.
    pub fn singular_values(&self) -> Vector3<f64> {
        self.0.singular_values()
    }

    /// The number of singular values above `epsilon` times the largest one.
    ///
    /// A zero matrix has rank `0`.
    pub fn rank(&self, epsilon: f64) -> usize {
        relative_rank(&self.0, epsilon)
    }

    /// The absolute value of `transpose(left) * E * right`.
    pub fn residual(&self, left: NormalizedKeyPoint, right: NormalizedKeyPoint) -> f64 {
        // The result is a 1x1 matrix which we must get element 0 from.
        (left.homogeneous().transpose() * self.0 * right.homogeneous())[0].abs()
    }
}

/// Counts the singular values of `matrix` larger than `epsilon` relative to the largest.
pub(crate) fn relative_rank(matrix: &Matrix3<f64>, epsilon: f64) -> usize {
    let singular_values = matrix.singular_values();
    let largest = singular_values
        .iter()
        .copied()
        .max_by_key(|&n| FloatOrd(n))
        .unwrap_or(0.0);
    if largest == 0.0 {
        return 0;
    }
    singular_values
        .iter()
        .filter(|&&n| n > epsilon * largest)
        .count()
}
