use std::{fmt, str::FromStr};

use phenocv_image::Image;
use phenocv_imgproc::{
    contours::Point,
    draw::draw_circle,
    moments::{moments, moments_in_window},
    shape::bounding_rect,
};
use serde::{Deserialize, Serialize};

use crate::{
    context::PipelineContext,
    diagnostics::{report, DiagnosticsSink},
    error::PhenoError,
};

/// Number of landmarks per set.
pub const LANDMARK_COUNT: usize = 20;

const NEAR_COLOR: [u8; 3] = [0, 0, 255];
const FAR_COLOR: [u8; 3] = [255, 0, 255];
const CENTER_COLOR: [u8; 3] = [255, 79, 0];

/// The axis the object is scanned along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    /// Scan columns, left to right.
    X,
    /// Scan rows, top to bottom.
    Y,
}

impl FromStr for Axis {
    type Err = PhenoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x" | "X" => Ok(Self::X),
            "y" | "Y" => Ok(Self::Y),
            _ => Err(PhenoError::InvalidAxis(s.to_string())),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => write!(f, "x"),
            Self::Y => write!(f, "y"),
        }
    }
}

impl Axis {
    /// Split a point into its coordinate along the axis and across it.
    fn split(self, p: Point<i32>) -> (i32, i32) {
        match self {
            Self::X => (p.x, p.y),
            Self::Y => (p.y, p.x),
        }
    }

    /// Build a point from a coordinate along the axis and across it.
    fn join(self, along: f64, across: f64) -> Point<f64> {
        match self {
            Self::X => Point::new(along, across),
            Self::Y => Point::new(across, along),
        }
    }
}

/// Three landmark sets of [`LANDMARK_COUNT`] points each.
///
/// Along the x axis `near` is the top edge and `far` the bottom edge, along
/// the y axis they are the left and right edges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LandmarkSets {
    /// The scanned axis.
    pub axis: Axis,
    /// Landmarks on the edge with the smaller coordinate.
    pub near: Vec<Point<f64>>,
    /// Landmarks on the edge with the larger coordinate.
    pub far: Vec<Point<f64>>,
    /// Centre of mass of each slice.
    pub center: Vec<Point<f64>>,
}

/// Sample the object on 20 slices across the axis.
fn sample_slices(
    axis: Axis,
    contour: &[Point<i32>],
    mask: &Image<u8, 1>,
    start: i32,
    extent: i32,
) -> LandmarkSets {
    let inc = extent as f64 / LANDMARK_COUNT as f64;
    let mut sets = LandmarkSets {
        axis,
        near: Vec::with_capacity(LANDMARK_COUNT),
        far: Vec::with_capacity(LANDMARK_COUNT),
        center: Vec::with_capacity(LANDMARK_COUNT),
    };

    for i in 0..LANDMARK_COUNT {
        let lo = start + (i as f64 * inc).floor() as i32;
        let hi = start + ((i + 1) as f64 * inc).floor() as i32;
        let mid = ((lo + hi) / 2) as f64;

        let (min, max) = contour
            .iter()
            .map(|&p| axis.split(p))
            .filter(|(a, _)| (lo..hi).contains(a))
            .fold(None, |acc: Option<(i32, i32)>, (_, o)| match acc {
                Some((mn, mx)) => Some((mn.min(o), mx.max(o))),
                None => Some((o, o)),
            })
            // slices without contour points collapse to a unit wide edge
            .unwrap_or((1, 1));

        let window = (lo.max(0) as usize)..(hi.max(0) as usize);
        let m = match axis {
            Axis::X => moments_in_window(mask, window, 0..mask.height()),
            Axis::Y => moments_in_window(mask, 0..mask.width(), window),
        };
        let center = match m.centroid() {
            Some((cx, cy)) if m.m00 > 0.001 && max - min > 3 => Point::new(cx, cy),
            _ => axis.join(mid, (min + max) as f64 / 2.0),
        };

        sets.near.push(axis.join(mid, min as f64));
        sets.far.push(axis.join(mid, max as f64));
        sets.center.push(center);
    }

    sets
}

/// A flat set of 20 consecutive positions at the bounding edges of an object
/// too small to be sliced.
fn degenerate(
    axis: Axis,
    mask: &Image<u8, 1>,
    start: i32,
    across_start: i32,
    across_extent: i32,
) -> LandmarkSets {
    let near = across_start as f64;
    let far = (across_start + across_extent - 1) as f64;
    let center = match (moments(mask).centroid(), axis) {
        (Some((_, cy)), Axis::X) => cy,
        (Some((cx, _)), Axis::Y) => cx,
        (None, _) => (near + far) / 2.0,
    };

    let line = |across: f64| -> Vec<Point<f64>> {
        (0..LANDMARK_COUNT as i32)
            .map(|i| axis.join((start + i) as f64, across))
            .collect()
    };

    LandmarkSets {
        axis,
        near: line(near),
        far: line(far),
        center: line(center),
    }
}

/// Generate pseudo-landmarks of an object along an axis.
///
/// The bounding box extent along the axis is split into 20 slices. In each
/// slice the smallest and largest contour coordinate across the axis give
/// the edge landmarks and the centre of mass of the mask restricted to the
/// slice gives the centre landmark. Objects narrower than 21 pixels get a
/// flat set at their bounding edges and centre of mass instead.
///
/// # Arguments
///
/// * `ctx` - The pipeline context, used to name the overlay.
/// * `img` - The image drawn on for the overlay.
/// * `contour` - The boundary points of the object.
/// * `mask` - The binary mask of the object.
/// * `axis` - The axis to scan along.
/// * `sink` - Receives `x_axis_pseudolandmarks` or `y_axis_pseudolandmarks`.
///
/// # Returns
///
/// `None` when the contour is empty.
pub fn axis_landmarks(
    ctx: PipelineContext,
    img: &Image<u8, 3>,
    contour: &[Point<i32>],
    mask: &Image<u8, 1>,
    axis: Axis,
    sink: &mut dyn DiagnosticsSink,
) -> Result<Option<LandmarkSets>, PhenoError> {
    if img.size() != mask.size() {
        return Err(PhenoError::SizeMismatch(
            mask.width(),
            mask.height(),
            img.width(),
            img.height(),
        ));
    }
    if contour.is_empty() {
        return Ok(None);
    }

    let rect = bounding_rect(contour);
    let (start, extent, across_start, across_extent) = match axis {
        Axis::X => (rect.x, rect.width, rect.y, rect.height),
        Axis::Y => (rect.y, rect.height, rect.x, rect.width),
    };

    let sets = if extent as usize > LANDMARK_COUNT {
        sample_slices(axis, contour, mask, start, extent)
    } else {
        log::debug!("{axis} extent {extent} is too small to slice");
        degenerate(axis, mask, start, across_start, across_extent)
    };

    if sink.enabled() {
        let mut overlay = img.clone();
        for (set, color) in [
            (&sets.near, NEAR_COLOR),
            (&sets.far, FAR_COLOR),
            (&sets.center, CENTER_COLOR),
        ] {
            for p in set {
                draw_circle(&mut overlay, (p.x as i64, p.y as i64), 10, color, true);
            }
        }
        let name = ctx.artifact_name(&format!("{axis}_axis_pseudolandmarks"));
        report(&name, sink.rgb(&name, &overlay));
    }

    Ok(Some(sets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{MemorySink, NoopSink};
    use approx::assert_relative_eq;
    use phenocv_image::ImageSize;
    use phenocv_imgproc::{
        contours::{find_contours, Contour},
        draw::fill_polygon,
    };

    fn object(
        size: ImageSize,
        rect: Contour,
    ) -> Result<(Image<u8, 3>, Vec<Point<i32>>, Image<u8, 1>), PhenoError> {
        let mut mask = Image::<u8, 1>::from_size_val(size, 0)?;
        fill_polygon(&mut mask, &rect.points, [255]);
        let contour = find_contours(&mask, 0).remove(0).points;
        Ok((Image::from_size_val(size, 0)?, contour, mask))
    }

    fn assert_cardinality(sets: &LandmarkSets) {
        assert_eq!(sets.near.len(), LANDMARK_COUNT);
        assert_eq!(sets.far.len(), LANDMARK_COUNT);
        assert_eq!(sets.center.len(), LANDMARK_COUNT);
    }

    #[test]
    fn test_small_object() -> Result<(), PhenoError> {
        let size = ImageSize {
            width: 40,
            height: 40,
        };
        let (img, contour, mask) = object(size, Contour::rectangle(10, 10, 5, 5))?;

        for axis in [Axis::X, Axis::Y] {
            let Some(sets) = axis_landmarks(
                PipelineContext::default(),
                &img,
                &contour,
                &mask,
                axis,
                &mut NoopSink,
            )?
            else {
                panic!("a square has landmarks");
            };
            assert_cardinality(&sets);
        }

        let Some(sets) = axis_landmarks(
            PipelineContext::default(),
            &img,
            &contour,
            &mask,
            Axis::X,
            &mut NoopSink,
        )?
        else {
            panic!("a square has landmarks");
        };
        assert_eq!(sets.near[0], Point::new(10.0, 10.0));
        assert_eq!(sets.near[19], Point::new(29.0, 10.0));
        assert_eq!(sets.far[5], Point::new(15.0, 14.0));
        assert_relative_eq!(sets.center[3].y, 12.0);
        Ok(())
    }

    #[test]
    fn test_long_object() -> Result<(), PhenoError> {
        let size = ImageSize {
            width: 240,
            height: 40,
        };
        let (img, contour, mask) = object(size, Contour::rectangle(10, 20, 200, 5))?;

        let Some(sets) = axis_landmarks(
            PipelineContext::default(),
            &img,
            &contour,
            &mask,
            Axis::X,
            &mut NoopSink,
        )?
        else {
            panic!("a bar has landmarks");
        };
        assert_cardinality(&sets);

        // slices are 10 columns wide
        assert_eq!(sets.near[0], Point::new(15.0, 20.0));
        assert_eq!(sets.far[0], Point::new(15.0, 24.0));
        assert_relative_eq!(sets.center[0].x, 14.5);
        assert_relative_eq!(sets.center[0].y, 22.0);
        assert_eq!(sets.near[19], Point::new(205.0, 20.0));
        Ok(())
    }

    #[test]
    fn test_tall_object() -> Result<(), PhenoError> {
        let size = ImageSize {
            width: 40,
            height: 240,
        };
        let (img, contour, mask) = object(size, Contour::rectangle(20, 10, 5, 200))?;

        let Some(sets) = axis_landmarks(
            PipelineContext::default(),
            &img,
            &contour,
            &mask,
            Axis::Y,
            &mut NoopSink,
        )?
        else {
            panic!("a bar has landmarks");
        };
        assert_cardinality(&sets);
        assert_eq!(sets.near[0], Point::new(20.0, 15.0));
        assert_eq!(sets.far[0], Point::new(24.0, 15.0));
        assert_relative_eq!(sets.center[0].x, 22.0);
        Ok(())
    }

    #[test]
    fn test_empty_contour_and_overlay() -> Result<(), PhenoError> {
        let size = ImageSize {
            width: 40,
            height: 40,
        };
        let (img, contour, mask) = object(size, Contour::rectangle(5, 5, 25, 10))?;
        let mut sink = MemorySink::new();

        let ctx = PipelineContext::default();
        let sets = axis_landmarks(ctx, &img, &[], &mask, Axis::X, &mut sink)?;
        assert!(sets.is_none());
        assert!(sink.is_empty());

        axis_landmarks(PipelineContext::new(7, 1), &img, &contour, &mask, Axis::Y, &mut sink)?;
        assert_eq!(sink.names(), vec!["7_y_axis_pseudolandmarks"]);
        Ok(())
    }

    #[test]
    fn test_parse_axis() -> Result<(), PhenoError> {
        assert_eq!("x".parse::<Axis>()?, Axis::X);
        assert_eq!("Y".parse::<Axis>()?, Axis::Y);
        assert!(matches!("z".parse::<Axis>(), Err(PhenoError::InvalidAxis(_))));
        Ok(())
    }
}
