use cv_epipolar::nalgebra::{Matrix3, Point2};
use cv_epipolar::{DepthFraction, EpipolarLine, LineSegment, StereoPair};
use log::*;
use serde::Serialize;

/// Everything computed for one picked pixel, as written to stdout.
#[derive(Debug, Serialize)]
pub struct Report {
    pub left_view: String,
    pub right_view: String,
    pub point: [f64; 2],
    /// Row-major.
    pub fundamental: [[f64; 3]; 3],
    pub baseline: f64,
    pub epipolar_line: Option<LineReport>,
    pub corresponding_point: Option<PointReport>,
    pub sweep: Vec<PointReport>,
    /// Failures of individual computations that did not stop the others.
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LineReport {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub start: [f64; 2],
    pub end: [f64; 2],
}

#[derive(Debug, Serialize)]
pub struct PointReport {
    pub depth_fraction: f64,
    pub depth: f64,
    pub point: [f64; 2],
}

impl LineReport {
    fn new(line: EpipolarLine, segment: LineSegment) -> Self {
        Self {
            a: line.a,
            b: line.b,
            c: line.c,
            start: [segment.start.x, segment.start.y],
            end: [segment.end.x, segment.end.y],
        }
    }
}

impl PointReport {
    fn new(pair: &StereoPair, depth: DepthFraction, point: Point2<f64>) -> Self {
        Self {
            depth_fraction: depth.value(),
            depth: depth.depth(&pair.left.depth),
            point: [point.x, point.y],
        }
    }
}

fn rows(matrix: &Matrix3<f64>) -> [[f64; 3]; 3] {
    let mut rows = [[0.0; 3]; 3];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, n) in row.iter_mut().enumerate() {
            *n = matrix[(r, c)];
        }
    }
    rows
}

/// Evaluates `pair` at `point`.
///
/// Failures of the fundamental matrix are fatal. A degenerate line or projection is recorded
/// in [`Report::errors`] so that the rest of the report is still produced.
pub fn evaluate(
    names: (&str, &str),
    pair: &StereoPair,
    point: Point2<f64>,
    depth: DepthFraction,
    steps: Option<usize>,
) -> cv_epipolar::Result<Report> {
    let fundamental = pair.fundamental()?;
    let mut errors = vec![];

    let epipolar_line = match pair
        .epipolar_line(point)
        .and_then(|line| Ok((line, line.segment(pair.right.width, pair.right.height)?)))
    {
        Ok((line, segment)) => Some(LineReport::new(line, segment)),
        Err(e) => {
            warn!("epipolar line: {}", e);
            errors.push(format!("epipolar line: {}", e));
            None
        }
    };

    let corresponding_point = match pair.corresponding_point(point, depth) {
        Ok(found) => Some(PointReport::new(pair, depth, found)),
        Err(e) => {
            warn!("corresponding point: {}", e);
            errors.push(format!("corresponding point: {}", e));
            None
        }
    };

    let sweep = match steps {
        Some(steps) => pair
            .corresponding_points(point, steps)?
            .into_iter()
            .map(|(depth, found)| PointReport::new(pair, depth, found))
            .collect(),
        None => vec![],
    };

    Ok(Report {
        left_view: names.0.to_owned(),
        right_view: names.1.to_owned(),
        point: [point.x, point.y],
        fundamental: rows(&fundamental.0),
        baseline: pair.baseline()?,
        epipolar_line,
        corresponding_point,
        sweep,
        errors,
    })
}
