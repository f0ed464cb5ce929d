use std::ops::{Add, Sub};

use phenocv_image::Image;
use serde::{Deserialize, Serialize};

/// Whether a border encloses foreground or background.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BorderType {
    /// Outside border of a foreground region.
    Outer,
    /// Border of a background region enclosed by foreground.
    Hole,
}

/// A pixel position or a sub-pixel coordinate, x to the right and y down.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point<T> {
    /// x-coordinate.
    pub x: T,
    /// y-coordinate.
    pub y: T,
}

impl<T> Point<T> {
    /// The point at `(x, y)`.
    pub fn new(x: T, y: T) -> Point<T> {
        Point::<T> { x, y }
    }
}

impl Point<i32> {
    /// Convert the integer point into floating point coordinates.
    pub fn to_f64(self) -> Point<f64> {
        Point::new(self.x as f64, self.y as f64)
    }
}

impl<T: num_traits::Num> Add for Point<T> {
    type Output = Self;

    fn add(self, other: Point<T>) -> Point<T> {
        Point::new(self.x + other.x, self.y + other.y)
    }
}

impl<T: num_traits::Num> Sub for Point<T> {
    type Output = Self;

    fn sub(self, other: Point<T>) -> Point<T> {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

/// The closed border of one connected region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contour {
    /// The points on the border, in tracing order.
    pub points: Vec<Point<i32>>,
    /// Outer border or hole.
    pub border_type: BorderType,
    /// Index of the enclosing contour, `None` for top level contours.
    pub parent: Option<usize>,
}

impl Contour {
    /// A contour from its parts.
    pub fn new(points: Vec<Point<i32>>, border_type: BorderType, parent: Option<usize>) -> Self {
        Contour {
            points,
            border_type,
            parent,
        }
    }

    /// Build a top level outer contour from polygon vertices.
    pub fn polygon(points: Vec<Point<i32>>) -> Self {
        Contour::new(points, BorderType::Outer, None)
    }

    /// Axis aligned rectangle polygon with inclusive corners.
    pub fn rectangle(x: i32, y: i32, width: i32, height: i32) -> Self {
        Contour::polygon(vec![
            Point::new(x, y),
            Point::new(x + width - 1, y),
            Point::new(x + width - 1, y + height - 1),
            Point::new(x, y + height - 1),
        ])
    }

    /// Number of points of the contour.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the contour has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Parent index per contour, `None` for top level contours.
pub type Hierarchy = Vec<Option<usize>>;

/// Extract the parent-index hierarchy of a contour set.
pub fn hierarchy(contours: &[Contour]) -> Hierarchy {
    contours.iter().map(|c| c.parent).collect()
}

/// Indices of `index` and every contour nested below it.
pub fn descendants(contours: &[Contour], index: usize) -> Vec<usize> {
    let mut out = vec![index];
    let mut i = 0;
    while i < out.len() {
        let current = out[i];
        out.extend(
            contours
                .iter()
                .enumerate()
                .filter(|(_, c)| c.parent == Some(current))
                .map(|(j, _)| j),
        );
        i += 1;
    }
    out
}

/// Capability that turns a binary mask into its contour set.
///
/// The returned contours carry the parent-index nesting: `parent` of a hole
/// is the outer border that encloses it, and an object found inside a hole
/// has that hole as its parent.
pub trait ContourSource {
    /// Find every contour of the foreground (non-zero) pixels of `mask`.
    fn find_contours(&self, mask: &Image<u8, 1>) -> Vec<Contour>;
}

/// Border following contour source, every boundary pixel is kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuzukiContours;

impl ContourSource for SuzukiContours {
    fn find_contours(&self, mask: &Image<u8, 1>) -> Vec<Contour> {
        find_contours(mask, 0)
    }
}

// 8-neighbourhood in clockwise order for a y-down image, starting east.
const NEIGHBORS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];
const EAST: usize = 0;

/// Label buffer of the border following, padded by one background pixel.
///
/// Labels are 0 for background, 1 for unvisited foreground and `±nbd` for
/// pixels on the border numbered `nbd`.
struct BorderTracer {
    labels: Vec<i32>,
    width: usize,
    height: usize,
}

impl BorderTracer {
    fn new(src: &Image<u8, 1>, threshold: u8) -> Self {
        let width = src.width() + 2;
        let height = src.height() + 2;
        let mut labels = vec![0i32; width * height];
        for (y, row) in src.as_slice().chunks_exact(src.width().max(1)).enumerate() {
            for (x, &v) in row.iter().enumerate() {
                if v > threshold {
                    labels[(y + 1) * width + x + 1] = 1;
                }
            }
        }
        Self {
            labels,
            width,
            height,
        }
    }

    fn index(&self, p: Point<usize>) -> usize {
        p.y * self.width + p.x
    }

    fn label(&self, p: Point<usize>) -> i32 {
        self.labels[self.index(p)]
    }

    fn set_label(&mut self, p: Point<usize>, value: i32) {
        let i = self.index(p);
        self.labels[i] = value;
    }

    /// The neighbour of `p` in direction `dir` if it is foreground.
    fn neighbor(&self, p: Point<usize>, dir: usize) -> Option<Point<usize>> {
        let (dx, dy) = NEIGHBORS[dir % 8];
        let (x, y) = (p.x as i32 + dx, p.y as i32 + dy);
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        let q = Point::new(x as usize, y as usize);
        (self.label(q) != 0).then_some(q)
    }

    fn direction(from: Point<usize>, to: Point<usize>) -> usize {
        let d = (to.x as i32 - from.x as i32, to.y as i32 - from.y as i32);
        NEIGHBORS.iter().position(|&n| n == d).unwrap_or(EAST)
    }

    /// First foreground neighbour clockwise from `start`, `start` included.
    fn clockwise(&self, p: Point<usize>, start: usize) -> Option<Point<usize>> {
        (0..8).find_map(|k| self.neighbor(p, start + k))
    }

    /// First foreground neighbour counter-clockwise after `start`, and
    /// whether the east neighbour was found empty on the way.
    fn counterclockwise(&self, p: Point<usize>, start: usize) -> Option<(Point<usize>, bool)> {
        let mut east_empty = false;
        for k in 1..=8 {
            let dir = (start + 8 - k) % 8;
            if let Some(q) = self.neighbor(p, dir) {
                return Some((q, east_empty));
            }
            east_empty |= dir == EAST;
        }
        None
    }

    /// Follow the border through `start`, entered from the background pixel
    /// `from`, labelling it with `nbd`. Points are returned unpadded.
    fn trace(&mut self, start: Point<usize>, from: Point<usize>, nbd: i32) -> Vec<Point<i32>> {
        let unpad = |p: Point<usize>| Point::new(p.x as i32 - 1, p.y as i32 - 1);

        let Some(first) = self.clockwise(start, Self::direction(start, from)) else {
            self.set_label(start, -nbd);
            return vec![unpad(start)];
        };

        let mut points = Vec::new();
        let (mut prev, mut curr) = (first, start);
        loop {
            points.push(unpad(curr));

            // prev is foreground so the search cannot fail
            let Some((next, east_empty)) = self.counterclockwise(curr, Self::direction(curr, prev))
            else {
                break;
            };

            if curr.x + 1 == self.width || east_empty {
                self.set_label(curr, -nbd);
            } else if self.label(curr) == 1 {
                self.set_label(curr, nbd);
            }

            if next == start && curr == first {
                break;
            }
            prev = curr;
            curr = next;
        }
        points
    }
}

/// Parent of a new border given the last border crossed on its row.
fn enclosing(contours: &[Contour], lnbd: i32, border_type: BorderType) -> Option<usize> {
    let index = usize::try_from(lnbd - 2).ok()?;
    let last = contours.get(index)?;
    if (border_type == BorderType::Outer) != (last.border_type == BorderType::Outer) {
        Some(index)
    } else {
        last.parent
    }
}

/// Trace the borders of every region of pixels brighter than `threshold`.
///
/// Implements the border following of Suzuki and Abe (1985). Pixels outside
/// the image count as background, so objects touching the frame still get a
/// closed outer border. Contours are listed in raster order of their first
/// pixel and carry their parent index.
pub fn find_contours(src: &Image<u8, 1>, threshold: u8) -> Vec<Contour> {
    let mut tracer = BorderTracer::new(src, threshold);
    let (width, height) = (tracer.width, tracer.height);
    let mut contours: Vec<Contour> = Vec::new();
    let mut nbd = 1i32;

    for y in 0..height {
        let mut lnbd = 1i32;

        for x in 0..width {
            let p = Point::new(x, y);
            let value = tracer.label(p);
            if value == 0 {
                continue;
            }

            let start = if value == 1 && x > 0 && tracer.label(Point::new(x - 1, y)) == 0 {
                Some((Point::new(x - 1, y), BorderType::Outer))
            } else if value >= 1 && x + 1 < width && tracer.label(Point::new(x + 1, y)) == 0 {
                if value > 1 {
                    lnbd = value;
                }
                Some((Point::new(x + 1, y), BorderType::Hole))
            } else {
                None
            };

            if let Some((from, border_type)) = start {
                nbd += 1;
                let parent = enclosing(&contours, lnbd, border_type);
                let mut points = tracer.trace(p, from, nbd);
                if border_type == BorderType::Hole {
                    points.reverse();
                }
                contours.push(Contour::new(points, border_type, parent));
            }

            let value = tracer.label(p);
            if value != 1 {
                lnbd = value.abs();
            }
        }
    }

    contours
}

#[cfg(test)]
mod tests {
    use super::*;
    use phenocv_image::{Image, ImageError, ImageSize};

    fn create_test_image_basic() -> Result<Image<u8, 1>, ImageError> {
        let mut img = Image::new(
            ImageSize {
                width: 10,
                height: 10,
            },
            vec![0; 10 * 10],
        )?;

        for y in 2..=7 {
            for x in 2..=7 {
                img.set_pixel(x, y, 0, 255)?;
            }
        }

        for y in 4..=5 {
            for x in 4..=5 {
                img.set_pixel(x, y, 0, 0)?;
            }
        }

        Ok(img)
    }

    fn create_test_image_nested() -> Result<Image<u8, 1>, ImageError> {
        let mut img = Image::new(
            ImageSize {
                width: 20,
                height: 20,
            },
            vec![0; 20 * 20],
        )?;

        for y in 2..=17 {
            for x in 2..=17 {
                img.set_pixel(x, y, 0, 255)?;
            }
        }

        for y in 5..=14 {
            for x in 5..=14 {
                img.set_pixel(x, y, 0, 0)?;
            }
        }

        for y in 8..=11 {
            for x in 8..=11 {
                img.set_pixel(x, y, 0, 255)?;
            }
        }

        Ok(img)
    }

    #[test]
    fn test_basic_contours() -> Result<(), ImageError> {
        let img = create_test_image_basic()?;
        let contours = find_contours(&img, 0);

        assert_eq!(contours.len(), 2);

        let outer = &contours[0];
        assert_eq!(outer.border_type, BorderType::Outer);
        assert_eq!(outer.parent, None);
        assert!(outer.points.contains(&Point::new(2, 2)));
        assert!(outer.points.contains(&Point::new(7, 2)));
        assert!(outer.points.contains(&Point::new(7, 7)));
        assert!(outer.points.contains(&Point::new(2, 7)));
        // every boundary pixel of a 6x6 square
        assert_eq!(outer.len(), 20);

        let hole = &contours[1];
        assert_eq!(hole.border_type, BorderType::Hole);
        assert_eq!(hole.parent, Some(0));
        assert!(hole.points.contains(&Point::new(3, 4)));
        assert!(hole.points.contains(&Point::new(6, 4)));
        assert!(hole.points.contains(&Point::new(5, 6)));
        assert!(hole.points.contains(&Point::new(5, 3)));

        Ok(())
    }

    #[test]
    fn test_single_pixel() -> Result<(), ImageError> {
        let mut img = Image::new(
            ImageSize {
                width: 5,
                height: 5,
            },
            vec![0; 5 * 5],
        )?;
        img.set_pixel(2, 2, 0, 255)?;

        let contours = find_contours(&img, 0);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].points, vec![Point::new(2, 2)]);
        assert_eq!(contours[0].border_type, BorderType::Outer);

        Ok(())
    }

    #[test]
    fn test_touching_frame() -> Result<(), ImageError> {
        let img = Image::new(
            ImageSize {
                width: 4,
                height: 3,
            },
            vec![255; 4 * 3],
        )?;

        let contours = SuzukiContours.find_contours(&img);
        assert_eq!(contours.len(), 1);
        assert!(contours[0].points.contains(&Point::new(0, 0)));
        assert!(contours[0].points.contains(&Point::new(3, 2)));
        assert_eq!(contours[0].len(), 10);

        Ok(())
    }

    #[test]
    fn test_nested_contours() -> Result<(), ImageError> {
        let img = create_test_image_nested()?;

        let contours = find_contours(&img, 0);
        assert_eq!(contours.len(), 3);

        assert_eq!(contours[0].border_type, BorderType::Outer);
        assert_eq!(contours[1].border_type, BorderType::Hole);
        assert_eq!(contours[1].parent, Some(0));
        assert_eq!(contours[2].border_type, BorderType::Outer);
        assert_eq!(contours[2].parent, Some(1));

        assert_eq!(hierarchy(&contours), vec![None, Some(0), Some(1)]);
        assert_eq!(descendants(&contours, 0), vec![0, 1, 2]);
        assert_eq!(descendants(&contours, 2), vec![2]);

        Ok(())
    }

    #[test]
    fn test_separate_objects() -> Result<(), ImageError> {
        let mut img = Image::new(
            ImageSize {
                width: 12,
                height: 6,
            },
            vec![0; 12 * 6],
        )?;
        for y in 1..4 {
            for x in 1..4 {
                img.set_pixel(x, y, 0, 255)?;
                img.set_pixel(x + 6, y + 1, 0, 255)?;
            }
        }

        let contours = find_contours(&img, 0);
        assert_eq!(contours.len(), 2);
        assert!(contours.iter().all(|c| c.parent.is_none()));
        assert!(contours.iter().all(|c| c.len() == 8));

        Ok(())
    }
}
