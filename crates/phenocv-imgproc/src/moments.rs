use std::ops::Range;

use phenocv_image::Image;
use serde::{Deserialize, Serialize};

use crate::contours::Point;

/// Spatial moments up to first order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Moments {
    /// Zeroth order moment, the area.
    pub m00: f64,
    /// First order moment along x.
    pub m10: f64,
    /// First order moment along y.
    pub m01: f64,
}

impl Moments {
    /// Centre of mass `(m10 / m00, m01 / m00)`, `None` for an empty region.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.m00 == 0.0 {
            return None;
        }
        Some((self.m10 / self.m00, self.m01 / self.m00))
    }
}

/// Compute the binary moments of a mask, every non-zero pixel weighs one.
///
/// # Examples
///
/// ```
/// use phenocv_image::{Image, ImageSize};
/// use phenocv_imgproc::moments::moments;
///
/// let mask = Image::<u8, 1>::new(ImageSize { width: 3, height: 1 }, vec![0, 255, 255]).unwrap();
/// let m = moments(&mask);
///
/// assert_eq!(m.m00, 2.0);
/// assert_eq!(m.centroid(), Some((1.5, 0.0)));
/// ```
pub fn moments(mask: &Image<u8, 1>) -> Moments {
    moments_in_window(mask, 0..mask.width(), 0..mask.height())
}

/// Compute the binary moments of the part of a mask inside a window.
///
/// Coordinates stay in the frame of the full mask and the window is clipped
/// to the mask size.
pub fn moments_in_window(mask: &Image<u8, 1>, cols: Range<usize>, rows: Range<usize>) -> Moments {
    let width = mask.width();
    let cols = cols.start.min(width)..cols.end.min(width);
    let rows = rows.start.min(mask.height())..rows.end.min(mask.height());

    let mut m = Moments::default();
    if width == 0 {
        return m;
    }

    for (y, row) in mask
        .as_slice()
        .chunks_exact(width)
        .enumerate()
        .skip(rows.start)
        .take(rows.len())
    {
        let mut count = 0u64;
        let mut sum_x = 0u64;
        for (x, &v) in row[cols.clone()].iter().enumerate() {
            if v != 0 {
                count += 1;
                sum_x += (x + cols.start) as u64;
            }
        }
        m.m00 += count as f64;
        m.m10 += sum_x as f64;
        m.m01 += (count * y as u64) as f64;
    }

    m
}

/// Compute the moments of the area enclosed by a closed polygon.
///
/// Uses Green's theorem over the polygon edges; the result does not depend
/// on the orientation of the vertices.
pub fn polygon_moments(points: &[Point<i32>]) -> Moments {
    let n = points.len();
    let mut m = Moments::default();
    if n < 3 {
        return m;
    }

    for i in 0..n {
        let a = points[i].to_f64();
        let b = points[(i + 1) % n].to_f64();
        let cross = a.x * b.y - b.x * a.y;
        m.m00 += cross;
        m.m10 += (a.x + b.x) * cross;
        m.m01 += (a.y + b.y) * cross;
    }

    m.m00 /= 2.0;
    m.m10 /= 6.0;
    m.m01 /= 6.0;

    if m.m00 < 0.0 {
        m.m00 = -m.m00;
        m.m10 = -m.m10;
        m.m01 = -m.m01;
    }

    m
}
