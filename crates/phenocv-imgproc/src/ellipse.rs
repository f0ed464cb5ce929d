use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::contours::Point;

/// A rotated ellipse as returned by [`fit_ellipse`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    /// Centre of the ellipse `(x, y)`.
    pub center: (f64, f64),
    /// Full length of the first axis, never larger than `height`.
    pub width: f64,
    /// Full length of the second axis.
    pub height: f64,
    /// Rotation of the first axis in degrees, in `[0, 180)`.
    pub angle: f64,
}

impl Ellipse {
    /// Length of the major axis.
    pub fn major_axis(&self) -> f64 {
        self.width.max(self.height)
    }

    /// Length of the minor axis.
    pub fn minor_axis(&self) -> f64 {
        self.width.min(self.height)
    }

    /// Eccentricity `sqrt(1 - (minor / major)^2)`, zero for a circle.
    pub fn eccentricity(&self) -> f64 {
        let ratio = self.minor_axis() / self.major_axis();
        (1.0 - ratio * ratio).max(0.0).sqrt()
    }
}

const MIN_EPS: f64 = 1e-8;

fn least_squares(a: DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = a.svd(true, true);
    let x = svd.solve(b, 1e-12).ok()?;
    x.iter().all(|v| v.is_finite()).then_some(x)
}

fn collinear(points: &[Point<i32>]) -> bool {
    let Some(&p0) = points.first() else {
        return true;
    };
    let Some(&p1) = points.iter().find(|&&p| p != p0) else {
        return true;
    };
    points.iter().all(|&p| {
        (p1.x - p0.x) as i64 * (p.y - p0.y) as i64 == (p1.y - p0.y) as i64 * (p.x - p0.x) as i64
    })
}

/// Fit an ellipse to a set of points in the least-squares sense.
///
/// The fit is solved in two linear stages on mean centred coordinates: a
/// general conic gives the centre, then the quadratic form around that
/// centre gives the axes and the rotation.
///
/// # Arguments
///
/// * `points` - At least five points.
///
/// # Returns
///
/// `None` when there are fewer than five points or the points do not
/// describe an ellipse, e.g. when they are collinear.
pub fn fit_ellipse(points: &[Point<i32>]) -> Option<Ellipse> {
    let n = points.len();
    if n < 5 || collinear(points) {
        return None;
    }

    let (mut mx, mut my) = (0.0, 0.0);
    for p in points {
        mx += p.x as f64;
        my += p.y as f64;
    }
    mx /= n as f64;
    my /= n as f64;

    let centred: Vec<(f64, f64)> = points
        .iter()
        .map(|p| (p.x as f64 - mx, p.y as f64 - my))
        .collect();

    // general conic: -A x^2 - B y^2 - C xy + D x + E y = 10000
    let a = DMatrix::from_fn(n, 5, |i, j| {
        let (x, y) = centred[i];
        match j {
            0 => -x * x,
            1 => -y * y,
            2 => -x * y,
            3 => x,
            _ => y,
        }
    });
    let b = DVector::from_element(n, 10000.0);
    let gfp = least_squares(a, &b)?;

    // zero gradient of the conic at the centre
    let a = DMatrix::from_row_slice(2, 2, &[2.0 * gfp[0], gfp[2], gfp[2], 2.0 * gfp[1]]);
    let b = DVector::from_row_slice(&[gfp[3], gfp[4]]);
    let rp = least_squares(a, &b)?;
    let (cx, cy) = (rp[0], rp[1]);

    // quadratic form around the centre: A x^2 + B y^2 + C xy = 1
    let a = DMatrix::from_fn(n, 3, |i, j| {
        let (x, y) = (centred[i].0 - cx, centred[i].1 - cy);
        match j {
            0 => x * x,
            1 => y * y,
            _ => x * y,
        }
    });
    let b = DVector::from_element(n, 1.0);
    let q = least_squares(a, &b)?;

    if q[0] <= 0.0 || q[1] <= 0.0 || 4.0 * q[0] * q[1] - q[2] * q[2] <= 0.0 {
        return None;
    }

    let theta = -0.5 * q[2].atan2(q[1] - q[0]);
    let t = if q[2].abs() > MIN_EPS {
        q[2] / (-2.0 * theta).sin()
    } else {
        q[1] - q[0]
    };

    let r1 = (q[0] + q[1] - t).abs();
    let r2 = (q[0] + q[1] + t).abs();
    if r1 <= MIN_EPS || r2 <= MIN_EPS {
        return None;
    }

    let mut width = 2.0 * (2.0 / r1).sqrt();
    let mut height = 2.0 * (2.0 / r2).sqrt();
    let mut angle = theta.to_degrees();
    if width > height {
        std::mem::swap(&mut width, &mut height);
        angle += 90.0;
    }
    let angle = angle.rem_euclid(180.0);

    let ellipse = Ellipse {
        center: (cx + mx, cy + my),
        width,
        height,
        angle,
    };

    [ellipse.center.0, ellipse.center.1, width, height, angle]
        .iter()
        .all(|v| v.is_finite())
        .then_some(ellipse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample_ellipse(cx: f64, cy: f64, a: f64, b: f64, angle_deg: f64) -> Vec<Point<i32>> {
        let phi = angle_deg.to_radians();
        (0..360)
            .step_by(3)
            .map(|deg| {
                let t = (deg as f64).to_radians();
                let (x, y) = (a * t.cos(), b * t.sin());
                Point::new(
                    (cx + x * phi.cos() - y * phi.sin()).round() as i32,
                    (cy + x * phi.sin() + y * phi.cos()).round() as i32,
                )
            })
            .collect()
    }

    #[test]
    fn test_fit_circle() {
        let pts = sample_ellipse(50.0, 40.0, 20.0, 20.0, 0.0);
        let Some(e) = fit_ellipse(&pts) else {
            panic!("circle should fit");
        };
        assert_abs_diff_eq!(e.center.0, 50.0, epsilon = 0.2);
        assert_abs_diff_eq!(e.center.1, 40.0, epsilon = 0.2);
        assert_abs_diff_eq!(e.major_axis(), 40.0, epsilon = 1.0);
        assert_abs_diff_eq!(e.minor_axis(), 40.0, epsilon = 1.0);
        assert!(e.eccentricity() < 0.3);
    }

    #[test]
    fn test_fit_rotated_ellipse() {
        let pts = sample_ellipse(100.0, 80.0, 60.0, 20.0, 30.0);
        let Some(e) = fit_ellipse(&pts) else {
            panic!("ellipse should fit");
        };
        assert_abs_diff_eq!(e.center.0, 100.0, epsilon = 0.5);
        assert_abs_diff_eq!(e.center.1, 80.0, epsilon = 0.5);
        assert_abs_diff_eq!(e.major_axis(), 120.0, epsilon = 2.0);
        assert_abs_diff_eq!(e.minor_axis(), 40.0, epsilon = 2.0);
        assert!(e.width <= e.height);
        assert!((0.0..180.0).contains(&e.angle));
        // the short axis is perpendicular to the 30 degree long axis
        assert_abs_diff_eq!(e.angle, 120.0, epsilon = 2.0);
        assert_abs_diff_eq!(
            e.eccentricity(),
            (1.0f64 - (20.0f64 / 60.0).powi(2)).sqrt(),
            epsilon = 0.02
        );
    }

    #[test]
    fn test_fit_degenerate() {
        let line: Vec<Point<i32>> = (0..10).map(|i| Point::new(i, 2 * i)).collect();
        assert!(fit_ellipse(&line).is_none());
        assert!(fit_ellipse(&line[..4]).is_none());
    }
}
