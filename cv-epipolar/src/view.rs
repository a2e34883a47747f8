use crate::{projection_matrix, CameraIntrinsics, CameraPose, DepthRange};
use nalgebra::{Matrix3, Matrix4};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Everything known about one camera of a stereo pair.
///
/// The image size bounds the epipolar segments drawn in this view. The depth range only
/// matters for plane-induced correspondences.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ViewParameters {
    pub intrinsics: CameraIntrinsics,
    pub pose: CameraPose,
    pub width: f64,
    pub height: f64,
    pub depth: DepthRange,
}

impl ViewParameters {
    pub fn new(
        intrinsics: CameraIntrinsics,
        pose: CameraPose,
        width: f64,
        height: f64,
        depth: DepthRange,
    ) -> Self {
        Self {
            intrinsics,
            pose,
            width,
            height,
            depth,
        }
    }

    /// The intrinsic matrix `K`.
    pub fn intrinsic_matrix(&self) -> Matrix3<f64> {
        self.intrinsics.matrix()
    }

    /// See [`projection_matrix`].
    pub fn projection(&self) -> Matrix4<f64> {
        projection_matrix(&self.intrinsic_matrix(), &self.depth)
    }
}
