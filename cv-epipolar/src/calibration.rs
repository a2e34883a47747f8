use crate::{
    normalize_extrinsic, CameraIntrinsics, CameraPose, DepthRange, EpipolarError, PoseConvention,
    Result, StereoPair, ViewParameters,
};
use nalgebra::SMatrix;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, fs::File, io::BufReader, io::Read, path::Path};

/// A stereo calibration file.
///
/// This is a JSON object with one `<view>_K` (3x3) and one `<view>_Rt` (4x4) entry per view,
/// both as arrays of rows, and the following shared entries:
///
/// * `w`, `h` - the image size in pixels
/// * `z_near`, `z_far` - the depth range of the projection matrices
/// * `scale` - display scale of the images (optional, defaults to `1.0`)
/// * `mpeg_intrinsic` - whether the `Rt` entries store a rotation and a camera center
///   rather than a world-to-camera pose (optional, defaults to `false`)
///
/// ```
/// use cv_epipolar::StereoCalibration;
/// let json = r#"{
///     "L_K": [[1000, 0, 320], [0, 1000, 240], [0, 0, 1]],
///     "L_Rt": [[1, 0, 0, 0], [0, 1, 0, 0], [0, 0, 1, 0], [0, 0, 0, 1]],
///     "R_K": [[1000, 0, 320], [0, 1000, 240], [0, 0, 1]],
///     "R_Rt": [[1, 0, 0, 0.1], [0, 1, 0, 0], [0, 0, 1, 0], [0, 0, 0, 1]],
///     "w": 640, "h": 480, "z_near": 1, "z_far": 100
/// }"#;
/// let calibration = StereoCalibration::from_reader(json.as_bytes()).unwrap();
/// assert_eq!(calibration.view_names(), vec!["L", "R"]);
/// let pair = calibration.stereo_pair("L", "R").unwrap();
/// assert_eq!(pair.right.pose.translation().x, 0.1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StereoCalibration {
    #[serde(rename = "w")]
    pub width: f64,
    #[serde(rename = "h")]
    pub height: f64,
    pub z_near: f64,
    pub z_far: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub mpeg_intrinsic: bool,
    /// The per-view `<view>_K` and `<view>_Rt` entries, and anything else in the file.
    #[serde(flatten)]
    pub entries: BTreeMap<String, Value>,
}

fn default_scale() -> f64 {
    1.0
}

impl StereoCalibration {
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("reading calibration from {}", path.display());
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// The convention the `Rt` entries are stored in.
    pub fn convention(&self) -> PoseConvention {
        if self.mpeg_intrinsic {
            PoseConvention::RotationAndCenter
        } else {
            PoseConvention::WorldToCamera
        }
    }

    pub fn depth_range(&self) -> Result<DepthRange> {
        DepthRange::new(self.z_near, self.z_far)
    }

    /// The names of all views that have both an intrinsic and an extrinsic entry, sorted.
    pub fn view_names(&self) -> Vec<&str> {
        self.entries
            .keys()
            .filter_map(|key| key.strip_suffix("_K"))
            .filter(|name| self.entries.contains_key(&format!("{}_Rt", name)))
            .collect()
    }

    pub fn intrinsics(&self, view: &str) -> Result<CameraIntrinsics> {
        let key = format!("{}_K", view);
        let matrix = self.matrix::<3, 3>(&key)?;
        CameraIntrinsics::from_matrix(&matrix).map_err(|_| EpipolarError::MalformedCalibration {
            key,
            reason: "not an upper-triangular pinhole matrix with positive focals".into(),
        })
    }

    /// The world-to-camera pose of a view, converted from the file's convention.
    pub fn pose(&self, view: &str) -> Result<CameraPose> {
        let raw = self.matrix::<4, 4>(&format!("{}_Rt", view))?;
        let pose = normalize_extrinsic(&raw, self.convention());
        if !pose.is_rigid(1e-6) {
            log::warn!("pose of view {} is not a rigid transform", view);
        }
        Ok(pose)
    }

    pub fn view(&self, view: &str) -> Result<ViewParameters> {
        Ok(ViewParameters::new(
            self.intrinsics(view)?,
            self.pose(view)?,
            self.width,
            self.height,
            self.depth_range()?,
        ))
    }

    pub fn stereo_pair(&self, left: &str, right: &str) -> Result<StereoPair> {
        Ok(StereoPair::new(self.view(left)?, self.view(right)?))
    }

    fn matrix<const R: usize, const C: usize>(&self, key: &str) -> Result<SMatrix<f64, R, C>> {
        let value = self
            .entries
            .get(key)
            .ok_or_else(|| EpipolarError::MissingCalibration(key.to_owned()))?;
        let malformed = |reason: String| EpipolarError::MalformedCalibration {
            key: key.to_owned(),
            reason,
        };
        let rows: Vec<Vec<f64>> =
            serde_json::from_value(value.clone()).map_err(|e| malformed(e.to_string()))?;
        if rows.len() != R || rows.iter().any(|row| row.len() != C) {
            return Err(malformed(format!("expected {} rows of {} numbers", R, C)));
        }
        Ok(SMatrix::from_fn(|r, c| rows[r][c]))
    }
}
