use phenocv_image::{Image, ImageSize};
use phenocv_imgproc::{contours::Point, draw::draw_circle, moments::moments, shape::bounding_rect};
use serde::Serialize;

use crate::{
    context::PipelineContext,
    diagnostics::{report, DiagnosticsSink},
    error::PhenoError,
};

const PLOT_SIZE: usize = 1500;
const PLOT_SCALE: f64 = 1000.0;
const PLOT_OFFSET: f64 = 250.0;

/// Landmarks mapped onto the unit box of their object, y pointing up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaledLandmarks {
    /// The scaled points, in input order.
    pub points: Vec<Point<f64>>,
    /// The scaled centre of mass of the mask.
    pub centroid: Point<f64>,
    /// The scaled boundary line reference.
    pub boundary_line: Point<f64>,
}

/// Rescale points onto the bounding box of an object.
///
/// `x' = (x - x0) / width` and `y' = (y - (y0 + height)) / -height`, so the
/// bottom left corner of the box maps to the origin.
///
/// # Arguments
///
/// * `ctx` - The pipeline context, used to name the `feature_scaled` plot.
/// * `contour` - The boundary points of the object.
/// * `mask` - The binary mask of the object.
/// * `points` - The points to rescale, e.g. landmarks.
/// * `boundary_line` - Height of a reference line above the image bottom,
///   the centre of mass is used when absent.
/// * `sink` - Receives the `feature_scaled` plot.
///
/// # Returns
///
/// `None` when the contour or the mask is empty.
pub fn scale_landmarks(
    ctx: PipelineContext,
    contour: &[Point<i32>],
    mask: &Image<u8, 1>,
    points: &[Point<f64>],
    boundary_line: Option<f64>,
    sink: &mut dyn DiagnosticsSink,
) -> Result<Option<ScaledLandmarks>, PhenoError> {
    if contour.is_empty() {
        return Ok(None);
    }
    let Some((cmx, cmy)) = moments(mask).centroid() else {
        return Ok(None);
    };

    let rect = bounding_rect(contour);
    let (x0, width) = (rect.x as f64, rect.width as f64);
    let (y0, height) = ((rect.y + rect.height) as f64, -(rect.height as f64));
    let scale = |x: f64, y: f64| Point::new((x - x0) / width, (y - y0) / height);

    let bly = boundary_line.map_or(cmy, |line| mask.rows() as f64 - line);

    let scaled = ScaledLandmarks {
        points: points.iter().map(|p| scale(p.x, p.y)).collect(),
        centroid: scale(cmx, cmy),
        boundary_line: scale(cmx, bly),
    };

    if sink.enabled() {
        let plot = plot_scaled(&scaled)?;
        let name = ctx.artifact_name("feature_scaled");
        report(&name, sink.rgb(&name, &plot));
    }

    Ok(Some(scaled))
}

/// Draw the scaled points on a black canvas with y pointing up.
fn plot_scaled(scaled: &ScaledLandmarks) -> Result<Image<u8, 3>, PhenoError> {
    let mut plot = Image::from_size_val(
        ImageSize {
            width: PLOT_SIZE,
            height: PLOT_SIZE,
        },
        0u8,
    )?;
    let at = |p: &Point<f64>| {
        let x = (p.x * PLOT_SCALE) as i64 + PLOT_OFFSET as i64;
        let y = (p.y * PLOT_SCALE) as i64 + PLOT_OFFSET as i64;
        (x, PLOT_SIZE as i64 - 1 - y)
    };

    for p in &scaled.points {
        draw_circle(&mut plot, at(p), 15, [255, 255, 255], true);
    }
    draw_circle(&mut plot, at(&scaled.centroid), 25, [255, 0, 0], true);
    draw_circle(&mut plot, at(&scaled.boundary_line), 25, [0, 255, 0], true);
    Ok(plot)
}
