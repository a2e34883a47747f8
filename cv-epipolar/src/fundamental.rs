use crate::essential::relative_rank;
use crate::{EpipolarError, EpipolarLine, EssentialMatrix, LineSegment, Result};
use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use nalgebra::{Matrix3, Point2};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The epipolar constraint in pixel coordinates:
///
/// transpose(x_l) * F * x_r = 0
///
/// Where `x_l` and `x_r` are homogeneous pixel coordinates in the left and right image.
/// It is the [`EssentialMatrix`] with both intrinsic matrices folded in,
/// `F = transpose(inverse(K_l)) * E * inverse(K_r)`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct FundamentalMatrix(pub Matrix3<f64>);

impl FundamentalMatrix {
    /// Folds the intrinsic matrices of both views into an essential matrix.
    ///
    /// Fails with [`EpipolarError::SingularMatrix`] when either intrinsic matrix has no inverse.
    pub fn from_essential(
        left_intrinsics: &Matrix3<f64>,
        right_intrinsics: &Matrix3<f64>,
        essential: &EssentialMatrix,
    ) -> Result<Self> {
        let left_inverse = left_intrinsics
            .try_inverse()
            .ok_or(EpipolarError::SingularMatrix {
                matrix: "left intrinsic",
            })?;
        let right_inverse = right_intrinsics
            .try_inverse()
            .ok_or(EpipolarError::SingularMatrix {
                matrix: "right intrinsic",
            })?;
        let fundamental = Self(left_inverse.transpose() * essential.0 * right_inverse);
        log::trace!("fundamental matrix: {:?}", fundamental.0);
        Ok(fundamental)
    }

    /// The line in the right image on which the match of the left pixel `left` lies.
    ///
    /// Its coefficients are `transpose(F) * x_l`, so solving for `y` gives
    ///
    /// ```text
    /// y_r(x_r) = (-F22 - F02*x_l - F20*x_r - F00*x_l*x_r - F12*y_l - F10*x_r*y_l) / (F21 + F01*x_l + F11*y_l)
    /// ```
    pub fn epipolar_line(&self, left: Point2<f64>) -> EpipolarLine {
        let coefficients = self.0.transpose() * left.to_homogeneous();
        EpipolarLine::new(coefficients.x, coefficients.y, coefficients.z)
    }

    /// The line in the left image on which the match of the right pixel `right` lies.
    pub fn left_epipolar_line(&self, right: Point2<f64>) -> EpipolarLine {
        let coefficients = self.0 * right.to_homogeneous();
        EpipolarLine::new(coefficients.x, coefficients.y, coefficients.z)
    }

    /// The epipolar line of `left` clipped to a right image of the given size.
    ///
    /// See [`EpipolarLine::segment`] for the handling of vertical and degenerate lines.
    pub fn epipolar_segment(
        &self,
        left: Point2<f64>,
        width: f64,
        height: f64,
    ) -> Result<LineSegment> {
        self.epipolar_line(left).segment(width, height)
    }

    /// The absolute value of `transpose(x_l) * F * x_r`.
    pub fn residual(&self, left: Point2<f64>, right: Point2<f64>) -> f64 {
        (left.to_homogeneous().transpose() * self.0 * right.to_homogeneous())[0].abs()
    }

    /// The matrix with the roles of the two views exchanged.
    pub fn swapped(&self) -> Self {
        Self(self.0.transpose())
    }

    /// See [`EssentialMatrix::rank`].
    pub fn rank(&self, epsilon: f64) -> usize {
        relative_rank(&self.0, epsilon)
    }
}
