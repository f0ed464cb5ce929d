use phenocv_imgproc::contours::Point;
use serde::Serialize;

use crate::{
    record::{Field, Record},
    scale::ScaledLandmarks,
};

/// Mean offsets of the scaled landmarks from one reference point.
///
/// All fields are `NaN` when there are no landmarks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceOffsets {
    /// Mean of `y - ry`, positive above the reference.
    pub vertical: f64,
    /// Mean of `|x - rx|`.
    pub horizontal: f64,
    /// Mean Euclidean distance.
    pub euclidean: f64,
    /// Mean elevation angle in degrees, negative below the reference.
    pub angle: f64,
}

/// Posture summary of scaled landmarks, a proxy for leaf turgor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TurgorProxy {
    /// Offsets from the scaled centre of mass.
    pub centroid: ReferenceOffsets,
    /// Offsets from the scaled boundary line reference.
    pub boundary_line: ReferenceOffsets,
}

impl Record for TurgorProxy {
    fn headers() -> &'static [&'static str] {
        &[
            "centroid_vertical_distance",
            "centroid_horizontal_distance",
            "centroid_euclidean_distance",
            "centroid_angle",
            "boundary_vertical_distance",
            "boundary_horizontal_distance",
            "boundary_euclidean_distance",
            "boundary_angle",
        ]
    }

    fn values(&self) -> Vec<Field> {
        [self.centroid, self.boundary_line]
            .iter()
            .flat_map(|o| [o.vertical, o.horizontal, o.euclidean, o.angle])
            .map(Field::Float)
            .collect()
    }
}

fn offsets(points: &[Point<f64>], reference: Point<f64>) -> ReferenceOffsets {
    let n = points.len() as f64;
    let mut sum = [0.0f64; 4];
    for p in points {
        let v = p.y - reference.y;
        let h = (p.x - reference.x).abs();
        let e = v.hypot(h);
        // angle of the right triangle (h, v, e) at the reference, 0 when e == 0
        let elevation = v.abs().atan2(h).to_degrees();
        sum[0] += v;
        sum[1] += h;
        sum[2] += e;
        sum[3] += if v < 0.0 { -elevation } else { elevation };
    }
    ReferenceOffsets {
        vertical: sum[0] / n,
        horizontal: sum[1] / n,
        euclidean: sum[2] / n,
        angle: sum[3] / n,
    }
}

/// Summarize how the scaled landmarks sit around the centre of mass and the
/// boundary line reference.
///
/// For every point the vertical offset `v`, the horizontal offset `h`, the
/// distance `e` and the angle `acos(h / e)` are measured from each reference
/// and averaged. The angle is negative for points below the reference.
///
/// ```
/// use phenocv::imgproc::contours::Point;
/// use phenocv::scale::ScaledLandmarks;
/// use phenocv::turgor::turgor_proxy;
///
/// let scaled = ScaledLandmarks {
///     points: vec![Point::new(1.0, 1.0)],
///     centroid: Point::new(0.0, 0.0),
///     boundary_line: Point::new(1.0, 0.0),
/// };
/// let proxy = turgor_proxy(&scaled);
/// assert!((proxy.centroid.angle - 45.0).abs() < 1e-9);
/// assert!((proxy.boundary_line.angle - 90.0).abs() < 1e-9);
/// ```
pub fn turgor_proxy(scaled: &ScaledLandmarks) -> TurgorProxy {
    TurgorProxy {
        centroid: offsets(&scaled.points, scaled.centroid),
        boundary_line: offsets(&scaled.points, scaled.boundary_line),
    }
}
