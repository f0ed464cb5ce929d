use phenocv_image::Image;
use phenocv_imgproc::{
    contours::Point,
    draw::{draw_circle, draw_line},
    moments::moments,
    shape::{bounding_rect, point_polygon_test},
};
use serde::Serialize;

use crate::{
    context::PipelineContext,
    diagnostics::{report, DiagnosticsSink},
    error::PhenoError,
    record::{Field, Record},
};

const ABOVE_COLOR: [u8; 3] = [0, 255, 0];
const BELOW_COLOR: [u8; 3] = [255, 0, 0];
const LINE_COLOR: [u8; 3] = [255, 0, 255];
const ABOVE_HEIGHT_COLOR: [u8; 3] = [0, 0, 255];

/// Extent and area of an object on either side of a horizontal line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundHorizontal {
    /// Height of the line above the image bottom.
    pub line_position: i64,
    /// Rows of the bounding rectangle above the line.
    pub height_above_bound: i64,
    /// Rows of the bounding rectangle below the line.
    pub height_below_bound: i64,
    /// Mask pixels above the line.
    pub above_bound_area: usize,
    /// `above_bound_area` in percent of the mask area.
    pub percent_above_bound_area: f64,
    /// Mask pixels below the line.
    pub below_bound_area: usize,
    /// `below_bound_area` in percent of the mask area.
    pub percent_below_bound_area: f64,
}

impl Record for BoundHorizontal {
    fn headers() -> &'static [&'static str] {
        &[
            "height_above_bound",
            "height_below_bound",
            "above_bound_area",
            "percent_above_bound_area",
            "below_bound_area",
            "percent_below_bound_area",
        ]
    }

    fn values(&self) -> Vec<Field> {
        vec![
            Field::Int(self.height_above_bound),
            Field::Int(self.height_below_bound),
            Field::Int(self.above_bound_area as i64),
            Field::Float(self.percent_above_bound_area),
            Field::Int(self.below_bound_area as i64),
            Field::Float(self.percent_below_bound_area),
        ]
    }
}

/// The region below the line, inset by one pixel from the frame and two
/// pixels from the line. A pixel counts as below only strictly inside it.
fn below_region(cols: usize, rows: usize, line_row: i64) -> [Point<i32>; 4] {
    let bottom = rows as i32 - 2;
    let top = (line_row - 2).clamp(0, rows as i64 - 1) as i32;
    let right = cols as i32 - 2;
    [
        Point::new(1, bottom),
        Point::new(right, bottom),
        Point::new(right, top),
        Point::new(1, top),
    ]
}

/// Measure an object against a horizontal line `line_position` pixels above
/// the image bottom.
///
/// The heights split the bounding rectangle of `contour` at row
/// `rows - line_position`. The areas split the mask pixels by the region
/// below the line, see the `boundary_line` overlay.
///
/// # Returns
///
/// `None` when the mask is empty.
pub fn analyze_bound_horizontal(
    ctx: PipelineContext,
    img: &Image<u8, 3>,
    contour: &[Point<i32>],
    mask: &Image<u8, 1>,
    line_position: i64,
    sink: &mut dyn DiagnosticsSink,
) -> Result<Option<BoundHorizontal>, PhenoError> {
    if img.size() != mask.size() {
        return Err(PhenoError::SizeMismatch(
            mask.width(),
            mask.height(),
            img.width(),
            img.height(),
        ));
    }

    let (cols, rows) = (mask.cols(), mask.rows());
    let line_row = rows as i64 - line_position;

    let rect = bounding_rect(contour);
    let (top, height) = (rect.y as i64, rect.height as i64);
    let above_rows = line_row - top;
    let (height_above_bound, height_below_bound) = if above_rows <= 0 {
        (0, height)
    } else if height <= above_rows {
        (height, 0)
    } else {
        (above_rows, height - above_rows)
    };

    let region = below_region(cols, rows, line_row);
    let mut overlay = sink.enabled().then(|| img.clone());
    let (mut above, mut below) = (0usize, 0usize);
    for (i, _) in mask.as_slice().iter().enumerate().filter(|&(_, &v)| v != 0) {
        let (x, y) = ((i % cols) as i64, (i / cols) as i64);
        let inside = point_polygon_test(&region, Point::new(x as f64, y as f64), false) > 0.0;
        let color = if inside {
            below += 1;
            BELOW_COLOR
        } else {
            above += 1;
            ABOVE_COLOR
        };
        if let Some(overlay) = overlay.as_mut() {
            draw_circle(overlay, (x, y), 1, color, true);
        }
    }

    let total = above + below;
    if total == 0 {
        log::debug!("empty mask has no boundary split");
        return Ok(None);
    }
    let percent = |n: usize| n as f64 * 100.0 / total as f64;

    let bound = BoundHorizontal {
        line_position,
        height_above_bound,
        height_below_bound,
        above_bound_area: above,
        percent_above_bound_area: percent(above),
        below_bound_area: below,
        percent_below_bound_area: percent(below),
    };
    log::debug!("boundary at row {line_row}: {above} pixels above, {below} below");

    if let Some(mut overlay) = overlay {
        let thickness = ctx.line_thickness;
        let guide_row = line_row - 4;
        draw_line(
            &mut overlay,
            (0, guide_row),
            (cols as i64, guide_row),
            LINE_COLOR,
            thickness,
        );

        if let Some((cmx, _)) = moments(mask).centroid() {
            let cx = cmx as i64;
            let bottom = top + height;
            if above_rows <= 0 {
                draw_line(&mut overlay, (cx, top), (cx, bottom), ABOVE_COLOR, thickness);
            } else if height <= above_rows {
                draw_line(&mut overlay, (cx, top), (cx, bottom), ABOVE_HEIGHT_COLOR, thickness);
            } else {
                let start = (cx, line_row - 2);
                let up = (cx, line_row - height_above_bound);
                let down = (cx, line_row + height_below_bound);
                draw_line(&mut overlay, start, up, ABOVE_HEIGHT_COLOR, thickness);
                draw_line(&mut overlay, start, down, ABOVE_COLOR, thickness);
            }
        }

        let name = ctx.artifact_name("boundary_line");
        report(&name, sink.rgb(&name, &overlay));
    }

    Ok(Some(bound))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Artifact, MemorySink, NoopSink};
    use approx::assert_relative_eq;
    use phenocv_image::ImageSize;
    use phenocv_imgproc::{contours::Contour, draw::fill_polygon};

    const SIZE: ImageSize = ImageSize {
        width: 40,
        height: 40,
    };

    fn object(contour: &Contour) -> Result<Image<u8, 1>, PhenoError> {
        let mut mask = Image::from_size_val(SIZE, 0u8)?;
        fill_polygon(&mut mask, &contour.points, [255]);
        Ok(mask)
    }

    #[test]
    fn test_straddling_object() -> Result<(), PhenoError> {
        let img = Image::<u8, 3>::from_size_val(SIZE, 0)?;
        // rows 15..=34, the line sits on row 25
        let contour = Contour::rectangle(10, 15, 10, 20);
        let mask = object(&contour)?;

        let Some(bound) = analyze_bound_horizontal(
            PipelineContext::default(),
            &img,
            &contour.points,
            &mask,
            15,
            &mut NoopSink,
        )?
        else {
            panic!("the mask is not empty");
        };

        assert_eq!(bound.height_above_bound, 10);
        assert_eq!(bound.height_below_bound, 10);
        // pixels count as below from row 24 on
        assert_eq!(bound.above_bound_area, 90);
        assert_eq!(bound.below_bound_area, 110);
        assert_relative_eq!(bound.percent_above_bound_area, 45.0);
        assert_relative_eq!(bound.percent_below_bound_area, 55.0);
        assert_eq!(
            bound.values(),
            vec![
                Field::Int(10),
                Field::Int(10),
                Field::Int(90),
                Field::Float(45.0),
                Field::Int(110),
                Field::Float(55.0),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_object_above_line() -> Result<(), PhenoError> {
        let img = Image::<u8, 3>::from_size_val(SIZE, 0)?;
        let contour = Contour::rectangle(5, 2, 6, 6);
        let mask = object(&contour)?;
        let mut sink = MemorySink::new();

        let Some(bound) = analyze_bound_horizontal(
            PipelineContext::new(6, 1),
            &img,
            &contour.points,
            &mask,
            15,
            &mut sink,
        )?
        else {
            panic!("the mask is not empty");
        };

        assert_eq!((bound.height_above_bound, bound.height_below_bound), (6, 0));
        assert_eq!((bound.above_bound_area, bound.below_bound_area), (36, 0));
        assert_relative_eq!(bound.percent_above_bound_area, 100.0);
        assert_relative_eq!(bound.percent_below_bound_area, 0.0);

        assert_eq!(sink.names(), vec!["6_boundary_line"]);
        match sink.get("6_boundary_line") {
            Some(Artifact::Rgb(overlay)) => {
                // guide line four rows above the boundary row
                assert_eq!(overlay.pixel(20, 21), Some(&LINE_COLOR[..]));
                assert_eq!(overlay.pixel(6, 3), Some(&ABOVE_COLOR[..]));
            }
            _ => panic!("the overlay is an rgb artifact"),
        }
        Ok(())
    }

    #[test]
    fn test_object_below_line() -> Result<(), PhenoError> {
        let img = Image::<u8, 3>::from_size_val(SIZE, 0)?;
        let contour = Contour::rectangle(5, 30, 4, 4);
        let mask = object(&contour)?;

        let Some(bound) = analyze_bound_horizontal(
            PipelineContext::default(),
            &img,
            &contour.points,
            &mask,
            15,
            &mut NoopSink,
        )?
        else {
            panic!("the mask is not empty");
        };

        assert_eq!((bound.height_above_bound, bound.height_below_bound), (0, 4));
        assert_eq!((bound.above_bound_area, bound.below_bound_area), (0, 16));
        Ok(())
    }

    #[test]
    fn test_empty_mask_and_size_mismatch() -> Result<(), PhenoError> {
        let img = Image::<u8, 3>::from_size_val(SIZE, 0)?;
        let empty = Image::<u8, 1>::from_size_val(SIZE, 0)?;
        let contour = Contour::rectangle(5, 5, 4, 4);

        let ctx = PipelineContext::default();
        let res = analyze_bound_horizontal(ctx, &img, &contour.points, &empty, 10, &mut NoopSink)?;
        assert!(res.is_none());

        let small = Image::<u8, 1>::from_size_val(
            ImageSize {
                width: 10,
                height: 10,
            },
            0,
        )?;
        let res = analyze_bound_horizontal(ctx, &img, &contour.points, &small, 10, &mut NoopSink);
        assert!(matches!(res, Err(PhenoError::SizeMismatch(10, 10, 40, 40))));
        Ok(())
    }
}
