use phenocv_image::Image;

use crate::contours::{descendants, Contour, Point};

/// Helper function to set a pixel's color, skipping coordinates outside the image.
#[inline]
fn set_pixel<const C: usize>(img: &mut Image<u8, C>, x: i64, y: i64, color: [u8; C]) {
    if img.contains(x, y) {
        if let Some(px) = img.pixel_mut(x as usize, y as usize) {
            px.copy_from_slice(&color);
        }
    }
}

/// Stamp a square brush of the given thickness centred at `(x, y)`.
#[inline]
fn stamp<const C: usize>(img: &mut Image<u8, C>, x: i64, y: i64, color: [u8; C], thickness: usize) {
    if thickness <= 1 {
        set_pixel(img, x, y, color);
        return;
    }
    let half = thickness as i64 / 2;
    for j in -half..=half {
        for i in -half..=half {
            set_pixel(img, x + i, y + j, color);
        }
    }
}

/// Draws a line on an image inplace using Bresenham's line algorithm.
///
/// # Arguments
///
/// * `img` - The image to draw on.
/// * `p0` - The start point of the line as a tuple of (x, y).
/// * `p1` - The end point of the line as a tuple of (x, y).
/// * `color` - The color of the line as an array of `C` elements.
/// * `thickness` - The thickness of the line, thicker lines use a square brush.
pub fn draw_line<const C: usize>(
    img: &mut Image<u8, C>,
    p0: (i64, i64),
    p1: (i64, i64),
    color: [u8; C],
    thickness: usize,
) {
    let (mut x0, mut y0) = p0;
    let (x1, y1) = p1;

    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };

    let mut err = dx - dy;

    loop {
        stamp(img, x0, y0, color, thickness);

        if x0 == x1 && y0 == y1 {
            break;
        }

        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x0 += sx;
        }
        if e2 < dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Draws a circle centred at `center` with the given radius.
///
/// A `filled` circle paints every pixel within `radius` of the centre,
/// otherwise only the one pixel wide ring is drawn.
pub fn draw_circle<const C: usize>(
    img: &mut Image<u8, C>,
    center: (i64, i64),
    radius: i64,
    color: [u8; C],
    filled: bool,
) {
    let (cx, cy) = center;
    let r2 = radius * radius;
    let inner2 = (radius - 1).max(0) * (radius - 1).max(0);
    for y in -radius..=radius {
        for x in -radius..=radius {
            let d2 = x * x + y * y;
            if d2 <= r2 && (filled || d2 > inner2 || radius == 0) {
                set_pixel(img, cx + x, cy + y, color);
            }
        }
    }
}

/// Draws the segments joining consecutive points.
///
/// With `closed` set the last point is joined back to the first.
pub fn draw_polyline<const C: usize>(
    img: &mut Image<u8, C>,
    points: &[Point<i32>],
    closed: bool,
    color: [u8; C],
    thickness: usize,
) {
    let as_tuple = |p: &Point<i32>| (p.x as i64, p.y as i64);

    match points {
        [] => {}
        [single] => stamp(img, single.x as i64, single.y as i64, color, thickness),
        _ => {
            for w in points.windows(2) {
                draw_line(img, as_tuple(&w[0]), as_tuple(&w[1]), color, thickness);
            }
            if closed {
                if let (Some(first), Some(last)) = (points.first(), points.last()) {
                    draw_line(img, as_tuple(last), as_tuple(first), color, thickness);
                }
            }
        }
    }
}

/// Draws the outline of every contour.
pub fn draw_contours<const C: usize>(
    img: &mut Image<u8, C>,
    contours: &[Contour],
    color: [u8; C],
    thickness: usize,
) {
    for contour in contours {
        draw_polyline(img, &contour.points, true, color, thickness);
    }
}

/// Fill the union of closed polygons with the even-odd rule.
///
/// Pixel `(x, y)` is painted when its centre lies inside an odd number of
/// polygons or exactly on any polygon edge. Crossings are kept as exact
/// rationals so the result does not depend on floating point rounding.
pub fn fill_polygons<const C: usize>(
    img: &mut Image<u8, C>,
    polygons: &[&[Point<i32>]],
    color: [u8; C],
) {
    let rows = img.rows() as i64;
    let cols = img.cols() as i64;
    let mut crossings: Vec<Vec<(i64, i64)>> = vec![Vec::new(); img.rows()];

    for poly in polygons {
        let n = poly.len();
        for (i, a) in poly.iter().enumerate() {
            let b = poly[(i + 1) % n];

            // vertices and horizontal edges are not hit by the half open rule
            set_pixel(img, a.x as i64, a.y as i64, color);
            if a.y == b.y {
                for x in a.x.min(b.x)..=a.x.max(b.x) {
                    set_pixel(img, x as i64, a.y as i64, color);
                }
                continue;
            }

            let (lo, hi) = if a.y < b.y { (*a, b) } else { (b, *a) };
            let den = (hi.y - lo.y) as i64;
            let slope = (hi.x - lo.x) as i64;
            for y in (lo.y as i64).max(0)..(hi.y as i64).min(rows) {
                let num = lo.x as i64 * den + (y - lo.y as i64) * slope;
                crossings[y as usize].push((num, den));
            }
        }
    }

    for (y, row) in crossings.iter_mut().enumerate() {
        row.sort_by(|a, b| (a.0 * b.1).cmp(&(b.0 * a.1)));
        for span in row.chunks_exact(2) {
            let (ln, ld) = span[0];
            let (rn, rd) = span[1];
            let start = -((-ln).div_euclid(ld));
            let end = rn.div_euclid(rd);
            for x in start.max(0)..=end.min(cols - 1) {
                set_pixel(img, x, y as i64, color);
            }
        }
    }
}

/// Fill a single closed polygon.
pub fn fill_polygon<const C: usize>(img: &mut Image<u8, C>, points: &[Point<i32>], color: [u8; C]) {
    fill_polygons(img, &[points], color);
}

/// Fill contour `index` using the nesting of the contour set.
///
/// The contour and every contour nested below it are filled together with
/// the even-odd rule, so holes stay unfilled while objects sitting inside
/// those holes are filled again.
pub fn fill_contour<const C: usize>(
    img: &mut Image<u8, C>,
    contours: &[Contour],
    index: usize,
    color: [u8; C],
) {
    if index >= contours.len() {
        return;
    }
    let polygons: Vec<&[Point<i32>]> = descendants(contours, index)
        .into_iter()
        .map(|i| contours[i].points.as_slice())
        .collect();
    fill_polygons(img, &polygons, color);
}

/// Fill every top level contour together with its nested contours.
pub fn fill_contours<const C: usize>(img: &mut Image<u8, C>, contours: &[Contour], color: [u8; C]) {
    for (i, contour) in contours.iter().enumerate() {
        if contour.parent.is_none() {
            fill_contour(img, contours, i, color);
        }
    }
}
