use phenocv_image::Image;
use phenocv_imgproc::{
    core::{apply_mask, hconcat},
    distance_transform::distance_transform,
    segmentation::{label, peak_local_max, watershed},
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    context::PipelineContext,
    diagnostics::{report, DiagnosticsSink},
    error::PhenoError,
    record::{Field, Record},
};

/// Parameters of the seed detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WatershedParams {
    /// Minimum separation of two seeds in pixels.
    pub min_distance: usize,
    /// Minimum seed height relative to the largest distance.
    pub threshold_rel: f32,
    /// Ignore seeds closer than `min_distance` to the image border.
    pub exclude_border: bool,
}

impl Default for WatershedParams {
    fn default() -> Self {
        Self {
            min_distance: 10,
            threshold_rel: 0.1,
            exclude_border: true,
        }
    }
}

/// Region partition of a mask.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatershedResult {
    /// Region label per pixel, 0 outside the mask.
    #[serde(skip)]
    pub labels: Image<i32, 1>,
    /// Number of distinct seeds.
    pub estimated_object_count: usize,
}

impl Record for WatershedResult {
    fn headers() -> &'static [&'static str] {
        &["estimated_object_count"]
    }

    fn values(&self) -> Vec<Field> {
        vec![Field::Int(self.estimated_object_count as i64)]
    }
}

/// Paint each label with a random color, seeded by the pipeline step.
fn colorize(labels: &Image<i32, 1>, count: usize, seed: u64) -> Result<Image<u8, 3>, PhenoError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let palette: Vec<[u8; 3]> = (0..count)
        .map(|_| {
            [
                rng.random_range(0..=255),
                rng.random_range(0..=255),
                rng.random_range(0..=255),
            ]
        })
        .collect();

    let data = labels
        .as_slice()
        .iter()
        .flat_map(|&l| match l {
            l if l > 0 => palette.get(l as usize - 1).copied().unwrap_or([0; 3]),
            _ => [0; 3],
        })
        .collect();
    Ok(Image::new(labels.size(), data)?)
}

/// Split touching objects with a distance transform watershed.
///
/// Seeds are the local maxima of the distance map, labelled by 8-connected
/// component. The seeds are flooded over the negated distance map inside
/// the mask. When `min_distance` is too large no seed is found and the
/// count is zero.
///
/// # Arguments
///
/// * `ctx` - The pipeline context, used to name the artifacts.
/// * `rgb` - The image the mask was segmented from.
/// * `mask` - The binary mask of the touching objects.
/// * `params` - The seed detection parameters.
/// * `sink` - Receives `watershed_dist_img` and `watershed_img`.
pub fn watershed_segmentation(
    ctx: PipelineContext,
    rgb: &Image<u8, 3>,
    mask: &Image<u8, 1>,
    params: &WatershedParams,
    sink: &mut dyn DiagnosticsSink,
) -> Result<WatershedResult, PhenoError> {
    if rgb.size() != mask.size() {
        return Err(PhenoError::SizeMismatch(
            mask.width(),
            mask.height(),
            rgb.width(),
            rgb.height(),
        ));
    }

    let mut dist = Image::<f32, 1>::from_size_val(mask.size(), 0.0)?;
    distance_transform(mask, &mut dist)?;

    let mut peaks = Image::<u8, 1>::from_size_val(mask.size(), 0)?;
    peak_local_max(
        &dist,
        &mut peaks,
        params.min_distance,
        params.threshold_rel,
        params.exclude_border,
    )?;
    let (markers, count) = label(&peaks)?;

    let relief = Image::new(
        dist.size(),
        dist.as_slice().iter().map(|&d| -d).collect(),
    )?;
    let labels = watershed(&relief, &markers, mask)?;
    log::debug!("watershed found {count} seeds");

    if sink.enabled() {
        let name = ctx.artifact_name("watershed_dist_img");
        report(&name, sink.distance_map(&name, &dist));

        let colored = colorize(&labels, count, ctx.step as u64)?;
        let mut masked = Image::from_size_val(mask.size(), 0u8)?;
        apply_mask(&colored, mask, &mut masked, [0, 0, 0])?;
        let composite = hconcat(&masked, rgb)?;
        let name = ctx.artifact_name("watershed_img");
        report(&name, sink.rgb(&name, &composite));
    }

    Ok(WatershedResult {
        labels,
        estimated_object_count: count,
    })
}
