use crate::{EpipolarError, Result};
use derive_more::{AsMut, AsRef, From, Into};
use nalgebra::{IsometryMatrix3, Matrix3, Matrix4, Rotation3, Vector3};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The extrinsic pose of a camera as a 4x4 homogeneous matrix that maps world
/// coordinates into camera coordinates.
///
/// The upper-left 3x3 block is the rotation, the first three rows of the last column
/// are the translation, and the last row is `[0, 0, 0, 1]`. This is the convention every
/// computation in this crate expects. Poses stored in another convention must first go
/// through [`normalize_extrinsic`].
#[derive(Debug, Clone, Copy, PartialEq, AsMut, AsRef, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CameraPose(pub Matrix4<f64>);

impl CameraPose {
    /// Creates a pose with no change in position or orientation.
    pub fn identity() -> Self {
        Self(Matrix4::identity())
    }

    /// Create the pose from rotation and translation.
    pub fn from_parts(translation: Vector3<f64>, rotation: Rotation3<f64>) -> Self {
        Self(IsometryMatrix3::from_parts(translation.into(), rotation).to_homogeneous())
    }

    /// A pose that only translates.
    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self::from_parts(translation, Rotation3::identity())
    }

    /// Retrieve the homogeneous matrix.
    pub fn homogeneous(self) -> Matrix4<f64> {
        self.0
    }

    /// The upper-left 3x3 rotation block.
    pub fn rotation(&self) -> Matrix3<f64> {
        self.0.fixed_slice::<3, 3>(0, 0).into_owned()
    }

    /// The translation column.
    pub fn translation(&self) -> Vector3<f64> {
        self.0.fixed_slice::<3, 1>(0, 3).into_owned()
    }

    /// Takes the inverse of the pose, which maps camera coordinates back into the world.
    pub fn inverse(&self) -> Result<Matrix4<f64>> {
        self.0
            .try_inverse()
            .ok_or(EpipolarError::SingularMatrix { matrix: "pose" })
    }

    /// The transform `self · other⁻¹`, which maps points in the camera space of `other`
    /// into the camera space of `self`.
    ///
    /// ```
    /// use cv_epipolar::CameraPose;
    /// use cv_epipolar::nalgebra::Vector3;
    /// let left = CameraPose::identity();
    /// let right = CameraPose::from_translation(Vector3::new(0.1, 0.0, 0.0));
    /// let relative = left.relative_to(&right).unwrap();
    /// assert!((relative[(0, 3)] + 0.1).abs() < 1e-12);
    /// ```
    pub fn relative_to(&self, other: &CameraPose) -> Result<Matrix4<f64>> {
        Ok(self.0 * other.inverse()?)
    }

    /// Checks that the rotation block is orthonormal and the last row is `[0, 0, 0, 1]`.
    pub fn is_rigid(&self, epsilon: f64) -> bool {
        let rotation = self.rotation();
        let orthonormal = (rotation.transpose() * rotation - Matrix3::identity()).amax() <= epsilon;
        let row = self.0.row(3);
        let homogeneous = row[0].abs() <= epsilon
            && row[1].abs() <= epsilon
            && row[2].abs() <= epsilon
            && (row[3] - 1.0).abs() <= epsilon;
        orthonormal && homogeneous
    }
}

/// How a raw extrinsic matrix stores the camera pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum PoseConvention {
    /// The matrix already maps world coordinates into camera coordinates.
    WorldToCamera,
    /// The rotation block is the world-to-camera rotation `R`, but the translation column
    /// holds the camera center `c` in world coordinates. This is the layout used by
    /// MPEG-style camera parameter files.
    RotationAndCenter,
}

impl Default for PoseConvention {
    fn default() -> Self {
        Self::WorldToCamera
    }
}

/// Converts a raw extrinsic matrix into a world-to-camera [`CameraPose`].
///
/// For [`PoseConvention::RotationAndCenter`] the result is `[R | -R·c]` with a
/// `[0, 0, 0, 1]` last row. Any other content of the raw matrix's last row is dropped.
///
/// ```
/// use cv_epipolar::{normalize_extrinsic, PoseConvention};
/// use cv_epipolar::nalgebra::{Matrix4, Vector3};
/// let mut raw = Matrix4::identity();
/// raw[(0, 3)] = 2.0;
/// let pose = normalize_extrinsic(&raw, PoseConvention::RotationAndCenter);
/// assert_eq!(pose.translation(), Vector3::new(-2.0, 0.0, 0.0));
/// ```
pub fn normalize_extrinsic(raw: &Matrix4<f64>, convention: PoseConvention) -> CameraPose {
    match convention {
        PoseConvention::WorldToCamera => CameraPose(*raw),
        PoseConvention::RotationAndCenter => {
            let rotation = raw.fixed_slice::<3, 3>(0, 0).into_owned();
            let center = raw.fixed_slice::<3, 1>(0, 3).into_owned();
            let translation = -(rotation * center);
            let mut pose = Matrix4::identity();
            pose.fixed_slice_mut::<3, 3>(0, 0).copy_from(&rotation);
            pose.fixed_slice_mut::<3, 1>(0, 3).copy_from(&translation);
            CameraPose(pose)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rotation_and_center_places_camera_center_at_origin() {
        let rotation = Rotation3::from_euler_angles(0.1, -0.3, 0.7);
        let center = Vector3::new(1.0, -2.0, 0.5);
        let mut raw = Matrix4::identity();
        raw.fixed_slice_mut::<3, 3>(0, 0)
            .copy_from(rotation.matrix());
        raw.fixed_slice_mut::<3, 1>(0, 3).copy_from(&center);

        let pose = normalize_extrinsic(&raw, PoseConvention::RotationAndCenter);
        let mapped = pose.homogeneous() * center.push(1.0);
        assert!(mapped.xyz().norm() < 1e-12, "{:?}", mapped);
        assert!(pose.is_rigid(1e-12));
    }

    #[test]
    fn world_to_camera_is_untouched() {
        let pose = CameraPose::from_parts(
            Vector3::new(0.3, 0.2, -1.0),
            Rotation3::from_euler_angles(0.2, 0.3, 0.4),
        );
        let normalized = normalize_extrinsic(&pose.homogeneous(), PoseConvention::WorldToCamera);
        assert_eq!(pose, normalized);
    }

    #[test]
    fn singular_pose_has_no_inverse() {
        let pose = CameraPose(Matrix4::zeros());
        assert!(matches!(
            pose.inverse(),
            Err(EpipolarError::SingularMatrix { matrix: "pose" })
        ));
        assert!(!pose.is_rigid(1e-9));
    }

    #[test]
    fn relative_pose_of_self_is_identity() {
        let pose = CameraPose::from_parts(
            Vector3::new(-0.8, 0.4, 0.5),
            Rotation3::from_euler_angles(0.2, 0.3, 0.4),
        );
        let relative = pose.relative_to(&pose).unwrap();
        assert!((relative - Matrix4::identity()).amax() < 1e-12);
    }
}
