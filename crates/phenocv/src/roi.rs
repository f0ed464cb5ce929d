use std::{fmt, str::FromStr};

use phenocv_image::{Image, ImageSize};
use phenocv_imgproc::{
    contours::{hierarchy, BorderType, Contour, ContourSource, Hierarchy, Point},
    core::{bitwise_and, count_non_zero},
    draw::{draw_contours, fill_contour, fill_contours, fill_polygons},
    moments::polygon_moments,
    shape::{contour_area, point_polygon_test},
};
use serde::{Deserialize, Serialize};

use crate::{
    context::PipelineContext,
    diagnostics::{report, DiagnosticsSink},
    error::{ConsistencyWarning, PhenoError},
};

/// Cutoff used by `pct` policies without a valid percentage.
pub const DEFAULT_PERCENT: u8 = 50;

/// Rule deciding which objects belong to the region of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoiPolicy {
    /// Keep objects with any boundary point inside the ROI.
    Partial,
    /// Like [`RoiPolicy::Partial`], then keep only the largest object.
    Largest,
    /// Clip the objects to the ROI.
    CutTo,
    /// Keep objects whose overlap with the ROI exceeds the given percentage of their area.
    Percent(u8),
    /// Keep objects whose centre of mass lies inside the ROI.
    MassCenter,
}

impl FromStr for RoiPolicy {
    type Err = PhenoError;

    /// Parse `partial`, `largest`, `cutto`, `massc` or `<N>pct`.
    ///
    /// A `pct` policy whose prefix is not an integer in `0..=100` uses
    /// [`DEFAULT_PERCENT`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "partial" => Ok(Self::Partial),
            "largest" => Ok(Self::Largest),
            "cutto" => Ok(Self::CutTo),
            "massc" => Ok(Self::MassCenter),
            _ => match s.strip_suffix("pct") {
                Some(prefix) => {
                    let percent = prefix
                        .trim()
                        .parse::<u8>()
                        .ok()
                        .filter(|p| *p <= 100)
                        .unwrap_or(DEFAULT_PERCENT);
                    Ok(Self::Percent(percent))
                }
                None => Err(PhenoError::InvalidRoiPolicy(s.to_string())),
            },
        }
    }
}

impl fmt::Display for RoiPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Partial => write!(f, "partial"),
            Self::Largest => write!(f, "largest"),
            Self::CutTo => write!(f, "cutto"),
            Self::Percent(p) => write!(f, "{p}pct"),
            Self::MassCenter => write!(f, "massc"),
        }
    }
}

/// Objects kept by [`classify_objects`].
///
/// The contours are traced from `mask`, so both always describe the same pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiResult {
    /// Contours of the kept objects.
    pub contours: Vec<Contour>,
    /// Parent index of every kept contour.
    pub hierarchy: Hierarchy,
    /// Filled mask of the kept objects.
    pub mask: Image<u8, 1>,
    /// Number of foreground pixels of `mask`.
    pub area: usize,
    /// Recoverable mismatches found while classifying.
    pub warnings: Vec<ConsistencyWarning>,
}

/// Fill the region covered by a set of ROI contours, holes excluded.
pub fn roi_mask(size: ImageSize, roi: &[Contour]) -> Result<Image<u8, 1>, PhenoError> {
    let mut mask = Image::from_size_val(size, 0u8)?;
    fill_contours(&mut mask, roi, [255]);
    Ok(mask)
}

/// Whether a point lies inside or on any top level ROI polygon and not
/// strictly inside one of its holes.
fn in_roi(roi: &[Contour], pt: Point<f64>) -> bool {
    roi.iter().enumerate().any(|(i, r)| {
        r.parent.is_none()
            && point_polygon_test(&r.points, pt, false) >= 0.0
            && !roi.iter().any(|h| {
                h.parent == Some(i)
                    && h.border_type == BorderType::Hole
                    && point_polygon_test(&h.points, pt, false) > 0.0
            })
    })
}

/// The object's own region: the contour minus its direct holes.
fn object_region(
    size: ImageSize,
    objects: &[Contour],
    index: usize,
) -> Result<Image<u8, 1>, PhenoError> {
    let polygons: Vec<&[Point<i32>]> = objects
        .iter()
        .enumerate()
        .filter(|(j, c)| *j == index || c.parent == Some(index))
        .map(|(_, c)| c.points.as_slice())
        .collect();
    let mut region = Image::from_size_val(size, 0u8)?;
    fill_polygons(&mut region, &polygons, [255]);
    Ok(region)
}

/// Membership of each object contour, holes are never tested.
fn membership(
    size: ImageSize,
    roi: &[Contour],
    roi_raster: &Image<u8, 1>,
    objects: &[Contour],
    policy: RoiPolicy,
) -> Result<Vec<bool>, PhenoError> {
    let mut keep = vec![false; objects.len()];
    for (i, obj) in objects.iter().enumerate() {
        if obj.border_type == BorderType::Hole {
            continue;
        }
        keep[i] = match policy {
            RoiPolicy::Partial | RoiPolicy::Largest => {
                obj.points.iter().any(|p| in_roi(roi, p.to_f64()))
            }
            RoiPolicy::MassCenter => match polygon_moments(&obj.points).centroid() {
                Some((x, y)) => in_roi(roi, Point::new(x, y)),
                None => false,
            },
            RoiPolicy::Percent(percent) => {
                let region = object_region(size, objects, i)?;
                let total = count_non_zero(&region);
                let overlap = region
                    .as_slice()
                    .iter()
                    .zip(roi_raster.as_slice())
                    .filter(|&(&o, &r)| o != 0 && r != 0)
                    .count();
                total > 0 && overlap as f64 / total as f64 > percent as f64 / 100.0
            }
            RoiPolicy::CutTo => true,
        };
    }
    Ok(keep)
}

/// Narrow the kept set to the largest object and its holes.
fn keep_largest(objects: &[Contour], keep: &mut [bool]) -> Option<ConsistencyWarning> {
    let candidates: Vec<usize> = (0..objects.len()).filter(|&i| keep[i]).collect();
    let largest = candidates.iter().copied().fold(None, |best: Option<(usize, f64)>, i| {
        let area = contour_area(&objects[i].points);
        match best {
            Some((_, a)) if a >= area => best,
            _ => Some((i, area)),
        }
    });

    for (i, k) in keep.iter_mut().enumerate() {
        *k = largest.is_some_and(|(l, _)| i == l);
    }

    (candidates.len() > 1).then(|| {
        ConsistencyWarning::SiblingsDropped {
            kept: candidates.len(),
        }
        .emit()
    })
}

/// Paint kept objects in 255 and dropped ones in 0, outer contours first.
fn paint_kept(
    size: ImageSize,
    objects: &[Contour],
    keep: &[bool],
) -> Result<Image<u8, 1>, PhenoError> {
    let mut mask = Image::from_size_val(size, 0u8)?;
    for (i, obj) in objects.iter().enumerate() {
        if obj.border_type == BorderType::Hole {
            continue;
        }
        let value = if keep[i] { 255 } else { 0 };
        fill_contour(&mut mask, objects, i, [value]);
    }
    Ok(mask)
}

/// Keep the objects that belong to a region of interest.
///
/// # Arguments
///
/// * `ctx` - The pipeline context, used to name the artifacts.
/// * `img` - The image the objects were found in.
/// * `roi` - The ROI contours with their nesting.
/// * `objects` - The object contours with their nesting.
/// * `policy` - The membership rule.
/// * `source` - Traces the contours of the kept mask.
/// * `sink` - Receives `roi_objects`, `obj_on_img` and `roi_mask`.
///
/// # Returns
///
/// The kept contours, their mask and pixel area. The `largest` policy
/// reports a warning when it drops other kept objects.
pub fn classify_objects<S: ContourSource + ?Sized>(
    ctx: PipelineContext,
    img: &Image<u8, 3>,
    roi: &[Contour],
    objects: &[Contour],
    policy: RoiPolicy,
    source: &S,
    sink: &mut dyn DiagnosticsSink,
) -> Result<RoiResult, PhenoError> {
    let size = img.size();
    let roi_raster = roi_mask(size, roi)?;
    let mut warnings = Vec::new();

    let mask = match policy {
        RoiPolicy::CutTo => {
            let mut all = Image::from_size_val(size, 0u8)?;
            fill_contours(&mut all, objects, [255]);
            let mut kept = Image::from_size_val(size, 0u8)?;
            bitwise_and(&all, &all, &mut kept, &roi_raster)?;
            kept
        }
        _ => {
            let mut keep = membership(size, roi, &roi_raster, objects, policy)?;
            if policy == RoiPolicy::Largest {
                warnings.extend(keep_largest(objects, &mut keep));
            }
            paint_kept(size, objects, &keep)?
        }
    };

    let contours = source.find_contours(&mask);
    let area = count_non_zero(&mask);
    log::debug!(
        "{policy} kept {} contours covering {area} pixels",
        contours.len()
    );

    if sink.enabled() {
        let silhouette = Image::new(
            size,
            mask.as_slice().iter().map(|&v| 255 - v).collect(),
        )?;
        let name = ctx.artifact_name("roi_objects");
        report(&name, sink.mask(&name, &silhouette));

        let mut overlay = img.clone();
        fill_contours(&mut overlay, &contours, [0, 255, 0]);
        draw_contours(&mut overlay, roi, [255, 0, 0], ctx.line_thickness);
        let name = ctx.artifact_name("obj_on_img");
        report(&name, sink.rgb(&name, &overlay));

        let name = ctx.artifact_name("roi_mask");
        report(&name, sink.mask(&name, &mask));
    }

    Ok(RoiResult {
        hierarchy: hierarchy(&contours),
        contours,
        mask,
        area,
        warnings,
    })
}
