mod report;

use cv_epipolar::nalgebra::Point2;
use cv_epipolar::{DepthFraction, StereoCalibration};
use log::*;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "epipolar",
    about = "Computes the epipolar line and plane-induced match of a pixel between two calibrated views"
)]
struct Opt {
    /// Name of the view the pixel is picked in.
    #[structopt(long, default_value = "L")]
    left: String,
    /// Name of the view the epipolar line and match are computed in.
    #[structopt(long, default_value = "R")]
    right: String,
    /// Pixel column in the left view.
    #[structopt(short, long, allow_hyphen_values = true, default_value = "0")]
    x: f64,
    /// Pixel row in the left view.
    #[structopt(short, long, allow_hyphen_values = true, default_value = "0")]
    y: f64,
    /// Normalized depth of the picked point.
    ///
    /// 1 is the near plane (`z_near`) and 0 is the far plane (`z_far`).
    #[structopt(short, long, default_value = "0")]
    depth: f64,
    /// Also sweep the depth from the far plane to the near plane in this many steps.
    #[structopt(short, long)]
    steps: Option<usize>,
    /// Only list the views in the calibration file.
    #[structopt(long)]
    list: bool,
    /// Pretty-print the JSON output.
    #[structopt(short, long)]
    pretty: bool,
    /// The calibration file (`param.json`) with `<view>_K` and `<view>_Rt` entries.
    #[structopt(parse(from_os_str))]
    calibration: PathBuf,
}

fn main() {
    pretty_env_logger::init_timed();
    let opt = Opt::from_args();
    if let Err(e) = run(&opt) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(opt: &Opt) -> Result<(), Box<dyn std::error::Error>> {
    let calibration = StereoCalibration::from_path(&opt.calibration)?;
    info!(
        "loaded calibration with views {:?}",
        calibration.view_names()
    );
    if opt.list {
        for name in calibration.view_names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let pair = calibration.stereo_pair(&opt.left, &opt.right)?;
    let point = Point2::new(opt.x, opt.y);
    if point.x < 0.0 || point.y < 0.0 || point.x > pair.left.width || point.y > pair.left.height {
        warn!("pixel {} is outside of the {} image", point, opt.left);
    }
    let depth = DepthFraction::new(opt.depth)?;

    let report = report::evaluate(
        (&opt.left, &opt.right),
        &pair,
        point,
        depth,
        opt.steps,
    )?;
    let stdout = std::io::stdout();
    if opt.pretty {
        serde_json::to_writer_pretty(stdout.lock(), &report)?;
    } else {
        serde_json::to_writer(stdout.lock(), &report)?;
    }
    println!();
    Ok(())
}
