use serde::{Deserialize, Serialize};

use crate::contours::Point;

/// Axis aligned rectangle with integer corner and inclusive extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// x-coordinate of the left column.
    pub x: i32,
    /// y-coordinate of the top row.
    pub y: i32,
    /// Number of columns covered.
    pub width: i32,
    /// Number of rows covered.
    pub height: i32,
}

impl Rect {
    /// Last column covered by the rectangle.
    pub fn right(&self) -> i32 {
        self.x + self.width - 1
    }

    /// Last row covered by the rectangle.
    pub fn bottom(&self) -> i32 {
        self.y + self.height - 1
    }
}

/// Compute the up-right bounding rectangle of a point set.
///
/// The width and height count pixels, so a single point has a 1x1 box.
/// An empty set yields the zero rectangle.
///
/// # Examples
///
/// ```
/// use phenocv_imgproc::contours::Point;
/// use phenocv_imgproc::shape::{bounding_rect, Rect};
///
/// let pts = [Point::new(2, 3), Point::new(5, 3), Point::new(4, 9)];
/// assert_eq!(bounding_rect(&pts), Rect { x: 2, y: 3, width: 4, height: 7 });
/// ```
pub fn bounding_rect(points: &[Point<i32>]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::default();
    };

    let (mut xmin, mut ymin, mut xmax, mut ymax) = (first.x, first.y, first.x, first.y);
    for p in points.iter().skip(1) {
        xmin = xmin.min(p.x);
        xmax = xmax.max(p.x);
        ymin = ymin.min(p.y);
        ymax = ymax.max(p.y);
    }

    Rect {
        x: xmin,
        y: ymin,
        width: xmax - xmin + 1,
        height: ymax - ymin + 1,
    }
}

#[inline]
fn cross(o: Point<i32>, a: Point<i32>, b: Point<i32>) -> i64 {
    (a.x - o.x) as i64 * (b.y - o.y) as i64 - (a.y - o.y) as i64 * (b.x - o.x) as i64
}

/// Compute the convex hull of a point set with the monotone chain algorithm.
///
/// Collinear points on the hull edges are dropped and duplicates are removed,
/// so a degenerate input returns one or two points.
pub fn convex_hull(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.x.cmp(&b.x).then(a.y.cmp(&b.y)));
    pts.dedup();

    if pts.len() < 3 {
        return pts;
    }

    let mut hull: Vec<Point<i32>> = Vec::with_capacity(2 * pts.len());

    // lower hull
    for &p in pts.iter() {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0 {
            hull.pop();
        }
        hull.push(p);
    }

    // upper hull
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0
        {
            hull.pop();
        }
        hull.push(p);
    }

    // the last point equals the first one
    hull.pop();

    // all points collinear
    if hull.len() == 2 && hull[0] == hull[1] {
        hull.pop();
    }

    hull
}

/// Twice the signed area of a closed polygon, exact in integers.
pub fn signed_area_x2(points: &[Point<i32>]) -> i64 {
    let n = points.len();
    if n < 3 {
        return 0;
    }
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64
        })
        .sum()
}

/// Signed area of a closed polygon via the shoelace formula.
pub fn signed_area(points: &[Point<i32>]) -> f64 {
    signed_area_x2(points) as f64 / 2.0
}

/// Absolute area of a closed polygon.
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    signed_area(points).abs()
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.abs()
}

/// Number of integer lattice points inside or on a closed polygon.
///
/// Uses Pick's theorem `A + B/2 + 1`, which makes the value directly
/// comparable with a pixel count of the rasterized polygon. Intended for
/// simple polygons such as convex hulls.
///
/// # Examples
///
/// ```
/// use phenocv_imgproc::contours::Point;
/// use phenocv_imgproc::shape::lattice_area;
///
/// // the pixel square 0..=9 x 0..=9
/// let square = [Point::new(0, 0), Point::new(9, 0), Point::new(9, 9), Point::new(0, 9)];
/// assert_eq!(lattice_area(&square), 100.0);
/// ```
pub fn lattice_area(points: &[Point<i32>]) -> f64 {
    let n = points.len();
    if n == 0 {
        return 0.0;
    }

    let boundary: i64 = (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            gcd((b.x - a.x) as i64, (b.y - a.y) as i64)
        })
        .sum();

    // a two point polygon walks its segment twice
    let twice_area = signed_area_x2(points).abs();
    ((twice_area + boundary) / 2 + 1) as f64
}

/// Compute the perimeter of a curve.
///
/// # Arguments
///
/// * `points` - The vertices of the curve.
/// * `closed` - Whether the segment from the last to the first vertex counts.
pub fn arc_length(points: &[Point<i32>], closed: bool) -> f64 {
    let n = points.len();
    if n < 2 {
        return 0.0;
    }

    let dist = |a: Point<i32>, b: Point<i32>| {
        let dx = (b.x - a.x) as f64;
        let dy = (b.y - a.y) as f64;
        (dx * dx + dy * dy).sqrt()
    };

    let open: f64 = points.windows(2).map(|w| dist(w[0], w[1])).sum();
    if closed {
        open + dist(points[n - 1], points[0])
    } else {
        open
    }
}

fn segment_distance(p: Point<f64>, a: Point<f64>, b: Point<f64>) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (a.x + t * dx - p.x, a.y + t * dy - p.y);
    (cx * cx + cy * cy).sqrt()
}

/// Test the position of a point relative to a closed polygon.
///
/// Returns `1.0` inside, `0.0` on an edge or vertex and `-1.0` outside. With
/// `measure_dist` set the signed distance to the nearest edge is returned
/// instead, positive inside.
///
/// # Examples
///
/// ```
/// use phenocv_imgproc::contours::Point;
/// use phenocv_imgproc::shape::point_polygon_test;
///
/// let square = [Point::new(0, 0), Point::new(4, 0), Point::new(4, 4), Point::new(0, 4)];
/// assert_eq!(point_polygon_test(&square, Point::new(2.0, 2.0), false), 1.0);
/// assert_eq!(point_polygon_test(&square, Point::new(4.0, 1.0), false), 0.0);
/// assert_eq!(point_polygon_test(&square, Point::new(5.0, 1.0), false), -1.0);
/// assert_eq!(point_polygon_test(&square, Point::new(2.0, 1.0), true), 1.0);
/// ```
pub fn point_polygon_test(points: &[Point<i32>], pt: Point<f64>, measure_dist: bool) -> f64 {
    let n = points.len();
    if n == 0 {
        return if measure_dist { f64::NEG_INFINITY } else { -1.0 };
    }

    const EPS: f64 = 1e-9;

    let mut inside = false;
    let mut on_edge = false;
    let mut min_dist = f64::INFINITY;

    for i in 0..n {
        let a = points[i].to_f64();
        let b = points[(i + 1) % n].to_f64();

        let d = segment_distance(pt, a, b);
        min_dist = min_dist.min(d);
        if d <= EPS {
            on_edge = true;
        }

        if (a.y > pt.y) != (b.y > pt.y) {
            let x_cross = a.x + (pt.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if pt.x < x_cross {
                inside = !inside;
            }
        }
    }

    if measure_dist {
        if on_edge {
            0.0
        } else if inside {
            min_dist
        } else {
            -min_dist
        }
    } else if on_edge {
        0.0
    } else if inside {
        1.0
    } else {
        -1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(x: i32, y: i32, side: i32) -> Vec<Point<i32>> {
        vec![
            Point::new(x, y),
            Point::new(x + side - 1, y),
            Point::new(x + side - 1, y + side - 1),
            Point::new(x, y + side - 1),
        ]
    }

    #[test]
    fn test_bounding_rect() {
        let rect = bounding_rect(&square(3, 4, 10));
        assert_eq!(
            rect,
            Rect {
                x: 3,
                y: 4,
                width: 10,
                height: 10
            }
        );
        assert_eq!(rect.right(), 12);
        assert_eq!(rect.bottom(), 13);
        assert_eq!(bounding_rect(&[]), Rect::default());
    }

    #[test]
    fn test_convex_hull_square_with_inner_points() {
        let mut pts = square(0, 0, 5);
        pts.push(Point::new(2, 2));
        pts.push(Point::new(2, 0));
        pts.push(Point::new(1, 3));

        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        for corner in square(0, 0, 5) {
            assert!(hull.contains(&corner));
        }
    }

    #[test]
    fn test_convex_hull_degenerate() {
        let line = [Point::new(0, 0), Point::new(1, 1), Point::new(3, 3)];
        assert_eq!(
            convex_hull(&line),
            vec![Point::new(0, 0), Point::new(3, 3)]
        );

        let single = [Point::new(2, 2), Point::new(2, 2)];
        assert_eq!(convex_hull(&single), vec![Point::new(2, 2)]);
    }

    #[test]
    fn test_areas() {
        let sq = square(0, 0, 10);
        assert_relative_eq!(contour_area(&sq), 81.0);
        assert_relative_eq!(lattice_area(&sq), 100.0);

        let mut reversed = sq.clone();
        reversed.reverse();
        assert_relative_eq!(signed_area(&reversed), -signed_area(&sq));

        assert_relative_eq!(lattice_area(&[Point::new(1, 1)]), 1.0);
        assert_relative_eq!(lattice_area(&[Point::new(0, 0), Point::new(4, 0)]), 5.0);

        // right triangle with legs of 4 pixels: 1 + 2 + 3 + 4 + 5
        let tri = [Point::new(0, 0), Point::new(4, 0), Point::new(0, 4)];
        assert_relative_eq!(lattice_area(&tri), 15.0);
    }

    #[test]
    fn test_arc_length() {
        let sq = square(0, 0, 4);
        assert_relative_eq!(arc_length(&sq, true), 12.0);
        assert_relative_eq!(arc_length(&sq, false), 9.0);
        assert_relative_eq!(arc_length(&[Point::new(0, 0), Point::new(3, 4)], false), 5.0);
    }

    #[test]
    fn test_point_polygon_test() {
        let sq = square(0, 0, 5);
        assert_eq!(point_polygon_test(&sq, Point::new(2.0, 2.0), false), 1.0);
        assert_eq!(point_polygon_test(&sq, Point::new(0.0, 0.0), false), 0.0);
        assert_eq!(point_polygon_test(&sq, Point::new(2.0, 4.0), false), 0.0);
        assert_eq!(point_polygon_test(&sq, Point::new(2.0, 4.5), false), -1.0);
        assert_eq!(point_polygon_test(&sq, Point::new(-3.0, 2.0), false), -1.0);

        assert_relative_eq!(point_polygon_test(&sq, Point::new(1.0, 2.0), true), 1.0);
        assert_relative_eq!(point_polygon_test(&sq, Point::new(7.0, 2.0), true), -3.0);
        assert_relative_eq!(point_polygon_test(&sq, Point::new(4.0, 2.0), true), 0.0);

        let pixel = [Point::new(3, 3)];
        assert_eq!(point_polygon_test(&pixel, Point::new(3.0, 3.0), false), 0.0);
        assert_eq!(point_polygon_test(&pixel, Point::new(3.0, 4.0), false), -1.0);
    }
}
