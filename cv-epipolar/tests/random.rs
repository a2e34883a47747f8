use cv_epipolar::nalgebra::{Point2, Rotation3, Vector2, Vector3};
use cv_epipolar::{
    CameraIntrinsics, CameraPose, DepthFraction, DepthRange, EssentialMatrix, StereoPair,
    ViewParameters,
};
use float_ord::FloatOrd;

const ROUNDS: usize = 1000;
const ROT_MAGNITUDE: f64 = 0.05;
const MAX_BASELINE: f64 = 0.5;
const PIXEL_TOLERANCE: f64 = 1e-6;

fn random_pose() -> CameraPose {
    let translation = (Vector3::<f64>::new_random() - Vector3::repeat(0.5)) * MAX_BASELINE;
    let rotation = Rotation3::new(
        (Vector3::<f64>::new_random() - Vector3::repeat(0.5)) * std::f64::consts::PI * 2.0 * ROT_MAGNITUDE,
    );
    CameraPose::from_parts(translation, rotation)
}

fn random_view(pose: CameraPose) -> ViewParameters {
    let jitter = Vector2::<f64>::new_random();
    let intrinsics = CameraIntrinsics::identity()
        .focals(Vector2::new(800.0, 800.0) + jitter * 200.0)
        .principal_point(Point2::new(320.0, 240.0) + (jitter - Vector2::repeat(0.5)) * 20.0);
    ViewParameters::new(
        intrinsics,
        pose,
        640.0,
        480.0,
        DepthRange::new(2.0, 50.0).unwrap(),
    )
}

fn random_pair() -> StereoPair {
    StereoPair::new(random_view(random_pose()), random_view(random_pose()))
}

fn random_pixel() -> Point2<f64> {
    let p = Vector2::<f64>::new_random();
    Point2::new(p.x * 640.0, p.y * 480.0)
}

#[test]
fn essential_has_rank_two() {
    let successes = (0..ROUNDS)
        .filter(|_| {
            let pair = random_pair();
            let essential = EssentialMatrix::from_poses(&pair.left.pose, &pair.right.pose).unwrap();
            let singular_values = essential.singular_values();
            let largest = singular_values.iter().copied().max_by_key(|&n| FloatOrd(n)).unwrap();
            let smallest = singular_values.iter().copied().min_by_key(|&n| FloatOrd(n)).unwrap();
            let rank_two = essential.rank(1e-9) == 2 && smallest < 1e-12 * largest;
            if !rank_two {
                eprintln!("singular values: {:?}", singular_values);
            }
            rank_two
        })
        .count();
    eprintln!("successes: {}", successes);
    assert!(successes > 990);
}

#[test]
fn corresponding_points_satisfy_epipolar_constraint() {
    let successes = (0..ROUNDS)
        .filter(|_| {
            let pair = random_pair();
            let fundamental = pair.fundamental().unwrap();
            let left = random_pixel();
            let depth = DepthFraction::new(rand_fraction()).unwrap();
            let right = match pair.corresponding_point(left, depth) {
                Ok(right) => right,
                Err(e) => {
                    eprintln!("no corresponding point: {}", e);
                    return false;
                }
            };
            let scale = fundamental.0.norm()
                * left.to_homogeneous().norm()
                * right.to_homogeneous().norm();
            let residual = fundamental.residual(left, right) / scale;
            if residual > 1e-10 {
                eprintln!("failed residual check: {}", residual);
                return false;
            }
            true
        })
        .count();
    eprintln!("successes: {}", successes);
    assert!(successes > 990);
}

#[test]
fn corresponding_points_lie_on_epipolar_line() {
    let _ = pretty_env_logger::try_init();
    let successes = (0..ROUNDS)
        .filter(|_| {
            let pair = random_pair();
            let left = random_pixel();
            let line = pair.epipolar_line(left).unwrap();
            let sweep = pair.corresponding_points(left, 20).unwrap();
            sweep.iter().all(|&(depth, right)| {
                let distance = line.distance(right);
                if distance > PIXEL_TOLERANCE {
                    eprintln!(
                        "point at depth fraction {} is {} pixels off the line",
                        depth.value(),
                        distance
                    );
                }
                distance <= PIXEL_TOLERANCE
            })
        })
        .count();
    eprintln!("successes: {}", successes);
    assert!(successes > 990);
}

#[test]
fn repeated_evaluation_is_bit_identical() {
    for _ in 0..100 {
        let pair = random_pair();
        let left = random_pixel();
        let depth = DepthFraction::new(rand_fraction()).unwrap();
        assert_eq!(pair.fundamental().unwrap(), pair.fundamental().unwrap());
        assert_eq!(pair.epipolar_line(left).unwrap(), pair.epipolar_line(left).unwrap());
        assert_eq!(
            pair.corresponding_point(left, depth).unwrap(),
            pair.corresponding_point(left, depth).unwrap()
        );
    }
}

fn rand_fraction() -> f64 {
    Vector2::<f64>::new_random().x
}
