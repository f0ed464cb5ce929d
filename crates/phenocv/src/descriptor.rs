use std::f64::consts::PI;

use phenocv_image::{Image, ImageSize};
use phenocv_imgproc::{
    contours::{Contour, Point},
    draw::{draw_circle, draw_line, draw_polyline, fill_polygon},
    ellipse::fit_ellipse,
    moments::moments,
    shape::{arc_length, bounding_rect, convex_hull, lattice_area, point_polygon_test},
};
use serde::Serialize;

use crate::{
    context::PipelineContext,
    diagnostics::{report, DiagnosticsSink},
    error::PhenoError,
    record::{Field, Record},
};

/// Minimum number of contour points needed to describe an object.
pub const MIN_CONTOUR_POINTS: usize = 5;

const CONTOUR_COLOR: [u8; 3] = [0, 0, 255];
const HULL_COLOR: [u8; 3] = [255, 0, 0];
const GUIDE_COLOR: [u8; 3] = [255, 0, 255];

/// Geometric description of one object.
///
/// Fields derived from the mask area are `NaN` when the mask is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeDescriptor {
    /// Number of foreground pixels of the mask.
    pub area: f64,
    /// Pixel area of the convex hull of the contour.
    pub hull_area: f64,
    /// `area / hull_area`.
    pub solidity: f64,
    /// `4 * pi * area / perimeter^2`.
    pub compactness: f64,
    /// Length of the closed contour.
    pub perimeter: f64,
    /// Width of the bounding rectangle.
    pub width: i32,
    /// Height of the bounding rectangle.
    pub height: i32,
    /// Pixel count of the caliper line through the centre of mass.
    pub longest_axis: usize,
    /// Centre of mass of the mask.
    pub center_of_mass: (f64, f64),
    /// Number of convex hull vertices.
    pub hull_vertices: usize,
    /// Whether no contour point touches the image frame.
    pub in_bounds: bool,
    /// Centre of the fitted ellipse.
    pub ellipse_center: (f64, f64),
    /// Major axis of the fitted ellipse.
    pub ellipse_major_axis: f64,
    /// Minor axis of the fitted ellipse.
    pub ellipse_minor_axis: f64,
    /// Rotation of the fitted ellipse in degrees.
    pub ellipse_angle: f64,
    /// Eccentricity of the fitted ellipse.
    pub ellipse_eccentricity: f64,
}

impl Record for ShapeDescriptor {
    fn headers() -> &'static [&'static str] {
        &[
            "area",
            "hull-area",
            "solidity",
            "compactness",
            "perimeter",
            "width",
            "height",
            "longest_axis",
            "center-of-mass-x",
            "center-of-mass-y",
            "hull_vertices",
            "in_bounds",
            "ellipse_center_x",
            "ellipse_center_y",
            "ellipse_major_axis",
            "ellipse_minor_axis",
            "ellipse_angle",
            "ellipse_eccentricity",
        ]
    }

    fn values(&self) -> Vec<Field> {
        vec![
            Field::Float(self.area),
            Field::Float(self.hull_area),
            Field::Float(self.solidity),
            Field::Float(self.compactness),
            Field::Float(self.perimeter),
            Field::Int(self.width as i64),
            Field::Int(self.height as i64),
            Field::Int(self.longest_axis as i64),
            Field::Float(self.center_of_mass.0),
            Field::Float(self.center_of_mass.1),
            Field::Int(self.hull_vertices as i64),
            Field::Bool(self.in_bounds),
            Field::Float(self.ellipse_center.0),
            Field::Float(self.ellipse_center.1),
            Field::Float(self.ellipse_major_axis),
            Field::Float(self.ellipse_minor_axis),
            Field::Float(self.ellipse_angle),
            Field::Float(self.ellipse_eccentricity),
        ]
    }
}

/// Pixels of the caliper line that fall inside the hull.
struct Caliper {
    length: usize,
    ends: Option<((i64, i64), (i64, i64))>,
}

/// Whether every point lies strictly inside the image frame.
fn within_frame(size: ImageSize, points: &[Point<i32>]) -> bool {
    let frame = Contour::rectangle(0, 0, size.width as i32, size.height as i32);
    points
        .iter()
        .all(|p| point_polygon_test(&frame.points, p.to_f64(), false) > 0.0)
}

/// Measure the line through `center` and the farthest hull vertex, clipped
/// to the frame and to the filled hull.
fn caliper(
    size: ImageSize,
    hull: &[Point<i32>],
    center: (i64, i64),
) -> Result<Caliper, PhenoError> {
    let (cx, cy) = center;
    let far = hull.iter().fold(None, |best: Option<(i64, Point<i32>)>, p| {
        let (dx, dy) = (p.x as i64 - cx, p.y as i64 - cy);
        let d2 = dx * dx + dy * dy;
        match best {
            Some((b, _)) if b >= d2 => best,
            _ => Some((d2, *p)),
        }
    });

    // horizontal line when the centre is the farthest vertex itself
    let (dx, dy) = match far {
        Some((d2, p)) if d2 > 0 => (p.x as i64 - cx, p.y as i64 - cy),
        _ => (1, 0),
    };

    // extend beyond the frame, pixels outside are skipped by the rasterizer
    let k = (size.width + size.height) as i64 / dx.abs().max(dy.abs()) + 1;
    let mut line = Image::<u8, 1>::from_size_val(size, 0)?;
    draw_line(
        &mut line,
        (cx - k * dx, cy - k * dy),
        (cx + k * dx, cy + k * dy),
        [255],
        1,
    );

    let mut hull_mask = Image::<u8, 1>::from_size_val(size, 0)?;
    fill_polygon(&mut hull_mask, hull, [255]);

    let mut hits = line
        .as_slice()
        .iter()
        .zip(hull_mask.as_slice())
        .enumerate()
        .filter(|&(_, (&l, &h))| l != 0 && h != 0)
        .map(|(i, _)| ((i % size.width) as i64, (i / size.width) as i64))
        .collect::<Vec<_>>();
    hits.sort_unstable();

    Ok(Caliper {
        length: hits.len(),
        ends: hits.first().copied().zip(hits.last().copied()),
    })
}

/// Compute the shape descriptor of one object.
///
/// # Arguments
///
/// * `ctx` - The pipeline context, used to name the `shapes` overlay.
/// * `img` - The image the object was segmented from, used for the overlay.
/// * `contour` - The boundary points of the object.
/// * `mask` - The binary mask of the object.
/// * `sink` - Receives the overlay when enabled.
///
/// # Returns
///
/// `None` when the contour has fewer than five points.
pub fn analyze_object(
    ctx: PipelineContext,
    img: &Image<u8, 3>,
    contour: &[Point<i32>],
    mask: &Image<u8, 1>,
    sink: &mut dyn DiagnosticsSink,
) -> Result<Option<ShapeDescriptor>, PhenoError> {
    if img.size() != mask.size() {
        return Err(PhenoError::SizeMismatch(
            mask.width(),
            mask.height(),
            img.width(),
            img.height(),
        ));
    }
    if contour.len() < MIN_CONTOUR_POINTS {
        log::debug!("contour with {} points is not described", contour.len());
        return Ok(None);
    }

    let size = mask.size();
    let in_bounds = within_frame(size, contour);

    let hull = convex_hull(contour);
    let hull_area = lattice_area(&hull);

    let m = moments(mask);
    let area = m.m00;
    let center_of_mass = m.centroid().unwrap_or((f64::NAN, f64::NAN));

    let perimeter = arc_length(contour, true);
    let rect = bounding_rect(contour);
    let ellipse = fit_ellipse(contour);

    let (solidity, compactness) = if area > 0.0 {
        let solidity = if hull_area > 0.0 { area / hull_area } else { 1.0 };
        (solidity, 4.0 * PI * area / (perimeter * perimeter))
    } else {
        (f64::NAN, f64::NAN)
    };

    let center = (center_of_mass.0 as i64, center_of_mass.1 as i64);
    let caliper = if area > 0.0 {
        caliper(size, &hull, center)?
    } else {
        Caliper {
            length: 0,
            ends: None,
        }
    };

    let descriptor = ShapeDescriptor {
        area,
        hull_area,
        solidity,
        compactness,
        perimeter,
        width: rect.width,
        height: rect.height,
        longest_axis: caliper.length,
        center_of_mass,
        hull_vertices: hull.len(),
        in_bounds,
        ellipse_center: ellipse.map_or((f64::NAN, f64::NAN), |e| e.center),
        ellipse_major_axis: ellipse.map_or(f64::NAN, |e| e.major_axis()),
        ellipse_minor_axis: ellipse.map_or(f64::NAN, |e| e.minor_axis()),
        ellipse_angle: ellipse.map_or(f64::NAN, |e| e.angle),
        ellipse_eccentricity: ellipse.map_or(f64::NAN, |e| e.eccentricity()),
    };

    log::debug!(
        "object area {} solidity {:.3} longest axis {}",
        descriptor.area,
        descriptor.solidity,
        descriptor.longest_axis
    );

    if sink.enabled() {
        let thickness = ctx.line_thickness;
        let mut overlay = img.clone();
        draw_polyline(&mut overlay, contour, true, CONTOUR_COLOR, thickness);
        draw_polyline(&mut overlay, &hull, true, HULL_COLOR, thickness);
        if area > 0.0 {
            let (cx, cy) = center;
            let (top, bottom) = (rect.y as i64, rect.bottom() as i64);
            let (left, right) = (rect.x as i64, rect.right() as i64);
            draw_line(&mut overlay, (cx, top), (cx, bottom), GUIDE_COLOR, thickness);
            draw_line(&mut overlay, (left, cy), (right, cy), GUIDE_COLOR, thickness);
            if let Some((a, b)) = caliper.ends {
                draw_line(&mut overlay, a, b, GUIDE_COLOR, thickness);
            }
            draw_circle(&mut overlay, center, 10, GUIDE_COLOR, false);
        }
        report(
            &ctx.artifact_name("shapes"),
            sink.rgb(&ctx.artifact_name("shapes"), &overlay),
        );
    }

    Ok(Some(descriptor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{MemorySink, NoopSink};
    use approx::assert_relative_eq;
    use phenocv_imgproc::contours::find_contours;

    fn object(
        size: ImageSize,
        polygon: &[Point<i32>],
    ) -> Result<(Vec<Point<i32>>, Image<u8, 1>), PhenoError> {
        let mut mask = Image::<u8, 1>::from_size_val(size, 0)?;
        fill_polygon(&mut mask, polygon, [255]);
        let contours = find_contours(&mask, 0);
        Ok((contours[0].points.clone(), mask))
    }

    fn frame(size: ImageSize) -> Result<Image<u8, 3>, PhenoError> {
        Ok(Image::from_size_val(size, 0)?)
    }

    #[test]
    fn test_square_descriptor() -> Result<(), PhenoError> {
        let size = ImageSize {
            width: 30,
            height: 30,
        };
        let (contour, mask) = object(size, &Contour::rectangle(10, 10, 10, 10).points)?;

        let Some(d) = analyze_object(
            PipelineContext::default(),
            &frame(size)?,
            &contour,
            &mask,
            &mut NoopSink,
        )?
        else {
            panic!("a square is described");
        };

        assert_eq!(d.area, 100.0);
        assert_eq!(d.hull_area, 100.0);
        assert_eq!(d.solidity, 1.0);
        assert_eq!(d.perimeter, 36.0);
        assert_eq!((d.width, d.height), (10, 10));
        assert_eq!(d.hull_vertices, 4);
        assert!(d.in_bounds);
        assert_relative_eq!(d.center_of_mass.0, 14.5);
        assert_relative_eq!(d.center_of_mass.1, 14.5);
        assert_relative_eq!(d.compactness, 4.0 * PI * 100.0 / (36.0 * 36.0));
        assert!(d.longest_axis >= 10);
        assert!(d.ellipse_eccentricity >= 0.0 && d.ellipse_eccentricity < 1.0);
        Ok(())
    }

    #[test]
    fn test_concave_solidity() -> Result<(), PhenoError> {
        let size = ImageSize {
            width: 30,
            height: 30,
        };
        let l_shape = [
            Point::new(5, 5),
            Point::new(9, 5),
            Point::new(9, 20),
            Point::new(20, 20),
            Point::new(20, 24),
            Point::new(5, 24),
        ];
        let (contour, mask) = object(size, &l_shape)?;

        let Some(d) = analyze_object(
            PipelineContext::default(),
            &frame(size)?,
            &contour,
            &mask,
            &mut NoopSink,
        )?
        else {
            panic!("an L shape is described");
        };

        assert!(d.solidity > 0.0 && d.solidity < 1.0);
        assert!(d.area < d.hull_area);
        Ok(())
    }

    #[test]
    fn test_too_few_points() -> Result<(), PhenoError> {
        let size = ImageSize {
            width: 10,
            height: 10,
        };
        let (contour, mask) = object(size, &Contour::rectangle(2, 2, 2, 2).points)?;
        assert!(contour.len() < MIN_CONTOUR_POINTS);

        let d = analyze_object(
            PipelineContext::default(),
            &frame(size)?,
            &contour,
            &mask,
            &mut NoopSink,
        )?;
        assert!(d.is_none());
        Ok(())
    }

    #[test]
    fn test_touching_frame() -> Result<(), PhenoError> {
        let size = ImageSize {
            width: 20,
            height: 20,
        };
        let (contour, mask) = object(size, &Contour::rectangle(0, 5, 8, 8).points)?;

        let Some(d) = analyze_object(
            PipelineContext::default(),
            &frame(size)?,
            &contour,
            &mask,
            &mut NoopSink,
        )?
        else {
            panic!("a square is described");
        };
        assert!(!d.in_bounds);
        assert_eq!(d.area, 64.0);
        Ok(())
    }

    #[test]
    fn test_empty_mask() -> Result<(), PhenoError> {
        let size = ImageSize {
            width: 20,
            height: 20,
        };
        let (contour, _) = object(size, &Contour::rectangle(5, 5, 8, 8).points)?;
        let empty = Image::<u8, 1>::from_size_val(size, 0)?;

        let Some(d) = analyze_object(
            PipelineContext::default(),
            &frame(size)?,
            &contour,
            &empty,
            &mut NoopSink,
        )?
        else {
            panic!("the contour has enough points");
        };
        assert_eq!(d.area, 0.0);
        assert!(d.solidity.is_nan());
        assert!(d.center_of_mass.0.is_nan());
        assert_eq!(d.hull_vertices, 4);
        assert!(d.in_bounds);
        Ok(())
    }

    #[test]
    fn test_overlay_and_record() -> Result<(), PhenoError> {
        let size = ImageSize {
            width: 40,
            height: 40,
        };
        let (contour, mask) = object(size, &Contour::rectangle(10, 12, 20, 8).points)?;
        let mut sink = MemorySink::new();

        let Some(d) = analyze_object(
            PipelineContext::new(4, 1),
            &frame(size)?,
            &contour,
            &mask,
            &mut sink,
        )?
        else {
            panic!("a rectangle is described");
        };

        assert_eq!(sink.names(), vec!["4_shapes"]);
        assert_eq!(ShapeDescriptor::headers().len(), d.values().len());
        assert_eq!(d.to_row()[0], ("area", Field::Float(160.0)));
        assert_eq!(d.to_row()[11], ("in_bounds", Field::Bool(true)));
        Ok(())
    }

    #[test]
    fn test_size_mismatch() -> Result<(), PhenoError> {
        let mask = Image::<u8, 1>::from_size_val(ImageSize { width: 4, height: 4 }, 0)?;
        let img = Image::<u8, 3>::from_size_val(ImageSize { width: 5, height: 4 }, 0)?;
        let res = analyze_object(PipelineContext::default(), &img, &[], &mask, &mut NoopSink);
        assert!(matches!(res, Err(PhenoError::SizeMismatch(4, 4, 5, 4))));
        Ok(())
    }
}
