//! This crate relates two calibrated pinhole views of the same scene. Given the intrinsic
//! matrix `K` and the world-to-camera pose `Rt` of a left and a right camera, it computes
//! the [`EssentialMatrix`] and [`FundamentalMatrix`] of the pair, the [`EpipolarLine`] in the
//! right image on which the match of a left pixel must lie, and the single right pixel that
//! matches a left pixel once a depth has been chosen for it.
//!
//! Everything here is a pure function of its inputs. There is no hidden state to thread
//! through: a caller that tracks a "current selection" owns it and passes it in.
//!
//! ```
//! use cv_epipolar::nalgebra::{Point2, Vector3};
//! use cv_epipolar::{CameraIntrinsics, CameraPose, DepthFraction, DepthRange, StereoPair, ViewParameters};
//!
//! let intrinsics = CameraIntrinsics::identity()
//!     .focal(1000.0)
//!     .principal_point(Point2::new(320.0, 240.0));
//! let depth = DepthRange::new(1.0, 100.0).unwrap();
//! let left = ViewParameters::new(intrinsics, CameraPose::identity(), 640.0, 480.0, depth);
//! let right = ViewParameters::new(
//!     intrinsics,
//!     CameraPose::from_translation(Vector3::new(0.1, 0.0, 0.0)),
//!     640.0,
//!     480.0,
//!     depth,
//! );
//! let pair = StereoPair::new(left, right);
//!
//! // A pure horizontal baseline gives horizontal epipolar lines.
//! let segment = pair.epipolar_segment(Point2::new(320.0, 240.0)).unwrap();
//! assert!((segment.start.y - 240.0).abs() < 1e-9);
//! assert!((segment.end.y - 240.0).abs() < 1e-9);
//!
//! // The point seen at the near plane moves along that line.
//! let near = pair
//!     .corresponding_point(Point2::new(320.0, 240.0), DepthFraction::NEAR)
//!     .unwrap();
//! assert!((near.y - 240.0).abs() < 1e-9);
//! ```

mod correspondence;
mod error;
mod essential;
mod fundamental;
mod line;
mod pose;
mod projection;
mod stereo;
mod view;

#[cfg(feature = "serde-serialize")]
mod calibration;

#[cfg(feature = "serde-serialize")]
pub use calibration::*;
pub use correspondence::*;
pub use error::*;
pub use essential::*;
pub use fundamental::*;
pub use line::*;
pub use nalgebra;
pub use pose::*;
pub use projection::*;
pub use stereo::*;
pub use view::*;

use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use nalgebra::{Matrix3, Point2, Point3, Vector2, Vector3};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A point in normalized image coordinates. This keypoint has been normalized based on
/// the camera intrinsic matrix, so it lies on the virtual image plane a distance of one
/// focal length in front of the optical center.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct NormalizedKeyPoint(pub Point2<f64>);

impl NormalizedKeyPoint {
    /// Appends a `1.0` component, giving the homogeneous normalized image coordinate
    /// used by the epipolar constraint.
    pub fn homogeneous(self) -> Vector3<f64> {
        self.0.coords.push(1.0)
    }

    /// Get the virtual image point as a [`Point3`] at depth `1.0` in front of the camera.
    pub fn virtual_image_point(self) -> Point3<f64> {
        self.coords.push(1.0).into()
    }

    /// Projects a point in camera space onto the virtual image plane.
    ///
    /// Returns `None` for points in the plane of the optical center.
    pub fn from_camera_point(point: Point3<f64>) -> Option<Self> {
        Point2::from_homogeneous(point.coords).map(Self)
    }
}

/// This contains intrinsic camera parameters as per
/// [this Wikipedia page](https://en.wikipedia.org/wiki/Camera_resectioning#Intrinsic_parameters).
///
/// [`CameraIntrinsics::from_matrix`] only accepts upper-triangular matrices with positive focal
/// lengths. The fields are public, so a zero focal length can still be set directly, and
/// operations that invert such a matrix fail with [`EpipolarError::SingularMatrix`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CameraIntrinsics {
    pub focals: Vector2<f64>,
    pub principal_point: Point2<f64>,
    pub skew: f64,
}

impl CameraIntrinsics {
    /// Creates camera intrinsics that would create an identity intrinsic matrix.
    /// This would imply that the pixel positions have an origin at `0,0`,
    /// the pixel distance unit is the focal length, pixels are square,
    /// and there is no skew.
    pub fn identity() -> Self {
        Self {
            focals: Vector2::new(1.0, 1.0),
            skew: 0.0,
            principal_point: Point2::new(0.0, 0.0),
        }
    }

    pub fn focals(self, focals: Vector2<f64>) -> Self {
        Self { focals, ..self }
    }

    pub fn focal(self, focal: f64) -> Self {
        Self {
            focals: Vector2::new(focal, focal),
            ..self
        }
    }

    pub fn principal_point(self, principal_point: Point2<f64>) -> Self {
        Self {
            principal_point,
            ..self
        }
    }

    pub fn skew(self, skew: f64) -> Self {
        Self { skew, ..self }
    }

    /// Reads the parameters back out of an intrinsic matrix `K`.
    ///
    /// The matrix is normalized so that `K[2][2]` is `1.0`. It must then be upper-triangular
    /// with finite entries and positive focal lengths, otherwise
    /// [`EpipolarError::InvalidIntrinsics`] is returned.
    ///
    /// ```
    /// use cv_epipolar::CameraIntrinsics;
    /// use cv_epipolar::nalgebra::Matrix3;
    /// let k = Matrix3::new(
    ///     800.0, 1.5, 320.0,
    ///     0.0, 900.0, 240.0,
    ///     0.0, 0.0, 1.0,
    /// );
    /// let intrinsics = CameraIntrinsics::from_matrix(&k).unwrap();
    /// assert_eq!(intrinsics.matrix(), k);
    ///
    /// let lower = Matrix3::new(
    ///     800.0, 0.0, 320.0,
    ///     3.0, 900.0, 240.0,
    ///     0.0, 0.0, 1.0,
    /// );
    /// assert!(CameraIntrinsics::from_matrix(&lower).is_err());
    /// ```
    pub fn from_matrix(matrix: &Matrix3<f64>) -> Result<Self> {
        let scale = matrix[(2, 2)];
        if !matrix.iter().all(|n| n.is_finite()) || scale == 0.0 {
            return Err(EpipolarError::InvalidIntrinsics);
        }
        let k = matrix.unscale(scale);
        let tolerance = f64::EPSILON * k.amax();
        let lower = [k[(1, 0)], k[(2, 0)], k[(2, 1)]];
        if lower.iter().any(|n| n.abs() > tolerance) || k[(0, 0)] <= 0.0 || k[(1, 1)] <= 0.0 {
            return Err(EpipolarError::InvalidIntrinsics);
        }
        Ok(Self {
            focals: Vector2::new(k[(0, 0)], k[(1, 1)]),
            principal_point: Point2::new(k[(0, 2)], k[(1, 2)]),
            skew: k[(0, 1)],
        })
    }

    #[rustfmt::skip]
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.focals.x,  self.skew,      self.principal_point.x,
            0.0,            self.focals.y,  self.principal_point.y,
            0.0,            0.0,            1.0,
        )
    }

    /// Takes in a point from an image in pixel coordinates and
    /// converts it to a [`NormalizedKeyPoint`].
    ///
    /// ```
    /// use cv_epipolar::CameraIntrinsics;
    /// use cv_epipolar::nalgebra::{Vector2, Point2};
    /// let intrinsics = CameraIntrinsics {
    ///     focals: Vector2::new(800.0, 900.0),
    ///     principal_point: Point2::new(500.0, 600.0),
    ///     skew: 1.7,
    /// };
    /// let kp = Point2::new(471.0, 322.0);
    /// let nkp = intrinsics.calibrate(kp);
    /// let distance = (kp.to_homogeneous() - intrinsics.matrix() * nkp.homogeneous()).norm();
    /// assert!(distance < 1e-9);
    /// ```
    pub fn calibrate(&self, point: Point2<f64>) -> NormalizedKeyPoint {
        let centered = point - self.principal_point;
        let y = centered.y / self.focals.y;
        let x = (centered.x - self.skew * y) / self.focals.x;
        NormalizedKeyPoint(Point2::new(x, y))
    }

    /// Converts a [`NormalizedKeyPoint`] back into pixel coordinates.
    ///
    /// ```
    /// use cv_epipolar::CameraIntrinsics;
    /// use cv_epipolar::nalgebra::{Vector2, Point2};
    /// let intrinsics = CameraIntrinsics {
    ///     focals: Vector2::new(800.0, 900.0),
    ///     principal_point: Point2::new(500.0, 600.0),
    ///     skew: 1.7,
    /// };
    /// let kp = Point2::new(471.0, 322.0);
    /// let ukp = intrinsics.uncalibrate(intrinsics.calibrate(kp));
    /// assert!((kp - ukp).norm() < 1e-6);
    /// ```
    pub fn uncalibrate(&self, projection: NormalizedKeyPoint) -> Point2<f64> {
        let y = projection.y * self.focals.y;
        let x = projection.x * self.focals.x + self.skew * projection.y;
        Point2::new(x, y) + self.principal_point.coords
    }
}
