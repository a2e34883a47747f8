use thiserror::Error;

/// Failures of the two-view geometry computations.
///
/// Every computation is deterministic, so a failure will recur for the same
/// inputs. None of these are retried internally.
#[derive(Debug, Error)]
pub enum EpipolarError {
    /// A matrix that must be inverted has no inverse.
    #[error("the {matrix} matrix is singular")]
    SingularMatrix { matrix: &'static str },
    /// The depth range does not satisfy `far > near > 0`.
    #[error("invalid depth range: near = {near}, far = {far}")]
    InvalidDepthRange { near: f64, far: f64 },
    /// A normalized depth outside of `[0, 1]`.
    #[error("depth fraction {0} is outside of [0, 1]")]
    InvalidDepthFraction(f64),
    /// The intrinsic matrix is not in upper-triangular pinhole form with positive focals.
    #[error("intrinsic matrix is not a valid pinhole calibration")]
    InvalidIntrinsics,
    /// The homogeneous coordinate of a projected point vanished.
    #[error("projected point has a vanishing homogeneous coordinate")]
    DegenerateProjection,
    /// The epipolar line coefficients do not describe a line.
    #[error("epipolar line is degenerate")]
    DegenerateEpipolarLine,
    /// A required entry is absent from a calibration record.
    #[cfg(feature = "serde-serialize")]
    #[error("calibration record has no `{0}` entry")]
    MissingCalibration(String),
    /// A calibration entry is present but has the wrong shape.
    #[cfg(feature = "serde-serialize")]
    #[error("calibration entry `{key}` is malformed: {reason}")]
    MalformedCalibration { key: String, reason: String },
    #[cfg(feature = "serde-serialize")]
    #[error("failed to read calibration: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "serde-serialize")]
    #[error("failed to parse calibration: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, EpipolarError>;
