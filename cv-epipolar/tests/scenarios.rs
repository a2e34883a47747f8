use cv_epipolar::nalgebra::{Matrix3, Point2, Rotation3, Vector3};
use cv_epipolar::{
    compute_projection_matrix, CameraIntrinsics, CameraPose, DepthFraction, DepthRange,
    EpipolarError, StereoPair, ViewParameters,
};

fn k() -> Matrix3<f64> {
    Matrix3::new(1000.0, 0.0, 320.0, 0.0, 1000.0, 240.0, 0.0, 0.0, 1.0)
}

fn view(pose: CameraPose) -> ViewParameters {
    ViewParameters::new(
        CameraIntrinsics::from_matrix(&k()).unwrap(),
        pose,
        640.0,
        480.0,
        DepthRange::new(1.0, 100.0).unwrap(),
    )
}

fn pair_with_right_translation(translation: Vector3<f64>) -> StereoPair {
    StereoPair::new(
        view(CameraPose::identity()),
        view(CameraPose::from_translation(translation)),
    )
}

#[test]
fn horizontal_baseline_gives_horizontal_line() {
    let pair = pair_with_right_translation(Vector3::new(0.1, 0.0, 0.0));
    let segment = pair.epipolar_segment(Point2::new(320.0, 240.0)).unwrap();
    assert_eq!(segment.start.x, 0.0);
    assert_eq!(segment.end.x, 640.0);
    assert!((segment.start.y - 240.0).abs() < 1e-9, "{:?}", segment);
    assert!((segment.end.y - 240.0).abs() < 1e-9, "{:?}", segment);
}

#[test]
fn vertical_baseline_falls_back_to_vertical_segment() {
    let pair = pair_with_right_translation(Vector3::new(0.0, 0.1, 0.0));
    let segment = pair.epipolar_segment(Point2::new(100.0, 50.0)).unwrap();
    assert!((segment.start.x - 100.0).abs() < 1e-9, "{:?}", segment);
    assert!((segment.end.x - 100.0).abs() < 1e-9, "{:?}", segment);
    assert_eq!(segment.start.y, 0.0);
    assert_eq!(segment.end.y, 480.0);
}

#[test]
fn disparity_grows_towards_near_plane() {
    let pair = pair_with_right_translation(Vector3::new(0.1, 0.0, 0.0));
    let left = Point2::new(320.0, 240.0);
    let far = pair.corresponding_point(left, DepthFraction::FAR).unwrap();
    let near = pair.corresponding_point(left, DepthFraction::NEAR).unwrap();
    // focal * baseline / depth
    assert!((far.x - 321.0).abs() < 1e-9, "{}", far);
    assert!((near.x - 420.0).abs() < 1e-9, "{}", near);

    let middle = DepthFraction::from_depth(&pair.left.depth, 10.0).unwrap();
    let found = pair.corresponding_point(left, middle).unwrap();
    assert!((found.x - 330.0).abs() < 1e-9, "{}", found);
    assert!((found.y - 240.0).abs() < 1e-9, "{}", found);
}

#[test]
fn identity_view_pair_is_degenerate() {
    let pair = StereoPair::new(view(CameraPose::identity()), view(CameraPose::identity()));
    let essential = pair.essential().unwrap();
    assert_eq!(essential.rank(1e-9), 0);
    assert!(pair.fundamental().unwrap().rank(1e-9) < 2);
    assert!(matches!(
        pair.epipolar_segment(Point2::new(200.0, 100.0)),
        Err(EpipolarError::DegenerateEpipolarLine)
    ));
    let found = pair
        .corresponding_point(Point2::new(200.0, 100.0), DepthFraction::new(0.3).unwrap())
        .unwrap();
    assert!((found - Point2::new(200.0, 100.0)).norm() < 1e-9);
}

#[test]
fn projection_matrix_boundary() {
    let projection = compute_projection_matrix(&k(), 1.0, 100.0).unwrap();
    assert_eq!(projection[(2, 2)], -1.0 / 99.0);
    assert_eq!(projection[(2, 3)], 100.0 / 99.0);
    assert_eq!(projection[(3, 2)], 1.0);
    assert!(matches!(
        compute_projection_matrix(&k(), 100.0, 100.0),
        Err(EpipolarError::InvalidDepthRange { .. })
    ));
    assert!(matches!(
        compute_projection_matrix(&k(), 100.0, 1.0),
        Err(EpipolarError::InvalidDepthRange { .. })
    ));
}

#[test]
fn point_in_right_camera_plane_is_degenerate_projection() {
    // The right camera looks sideways, so the left optical axis lies in its focal plane.
    let right = CameraPose::from_parts(
        Vector3::zeros(),
        Rotation3::from_axis_angle(&Vector3::y_axis(), std::f64::consts::FRAC_PI_2),
    );
    let pair = StereoPair::new(view(CameraPose::identity()), view(right));
    assert!(matches!(
        pair.corresponding_point(Point2::new(320.0, 240.0), DepthFraction::NEAR),
        Err(EpipolarError::DegenerateProjection)
    ));
}

#[cfg(feature = "serde-serialize")]
#[test]
fn calibration_file_round_trip() {
    use cv_epipolar::StereoCalibration;

    let json = r#"{
        "L_K": [[1000, 0, 320], [0, 1000, 240], [0, 0, 1]],
        "L_Rt": [[1, 0, 0, 0], [0, 1, 0, 0], [0, 0, 1, 0], [0, 0, 0, 1]],
        "R_K": [[1000, 0, 320], [0, 1000, 240], [0, 0, 1]],
        "R_Rt": [[1, 0, 0, -0.1], [0, 1, 0, 0], [0, 0, 1, 0], [0, 0, 0, 1]],
        "w": 640, "h": 480, "scale": 1, "z_near": 1, "z_far": 100,
        "mpeg_intrinsic": true
    }"#;
    let calibration = StereoCalibration::from_reader(json.as_bytes()).unwrap();
    let pair = calibration.stereo_pair("L", "R").unwrap();
    // The camera center at x = -0.1 becomes a world-to-camera translation of +0.1.
    assert_eq!(pair.right.pose.translation(), Vector3::new(0.1, 0.0, 0.0));
    let near = pair
        .corresponding_point(Point2::new(320.0, 240.0), DepthFraction::NEAR)
        .unwrap();
    assert!((near.x - 420.0).abs() < 1e-9);

    let written = serde_json::to_string(&calibration).unwrap();
    let read = StereoCalibration::from_reader(written.as_bytes()).unwrap();
    assert_eq!(read, calibration);
}
