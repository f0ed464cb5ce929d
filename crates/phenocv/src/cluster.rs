use phenocv_image::Image;
use phenocv_imgproc::{
    contours::Contour,
    core::{apply_mask, count_non_zero},
    draw::fill_polygon,
};

use crate::{
    context::PipelineContext,
    diagnostics::{report, DiagnosticsSink},
    error::{ConsistencyWarning, PhenoError},
};

/// One cluster cut out of the image.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterOutput {
    /// `{base}_{name}_p{position}`.
    pub name: String,
    /// Filled mask of the contours of the group.
    pub mask: Image<u8, 1>,
    /// The image inside the mask on a white background.
    pub image: Image<u8, 3>,
}

/// Result of [`split_clusters`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSplit {
    /// One output per non-empty group.
    pub outputs: Vec<ClusterOutput>,
    /// Name and group count mismatches, empty groups.
    pub warnings: Vec<ConsistencyWarning>,
}

/// Pair the groups with the names, dropping groups or names until both match.
///
/// Extra groups are removed smallest total contour length first, the
/// survivors keep their input order.
fn reconcile<'a>(
    groups: &'a [Vec<usize>],
    contours: &[Contour],
    mut names: Vec<String>,
    warnings: &mut Vec<ConsistencyWarning>,
) -> Vec<(usize, &'a [usize], String)> {
    let mut kept: Vec<usize> = (0..groups.len()).collect();

    if names.len() < groups.len() {
        warnings.push(
            ConsistencyWarning::GroupsTrimmed {
                groups: groups.len(),
                names: names.len(),
            }
            .emit(),
        );
        let total = |g: &usize| -> usize {
            groups[*g]
                .iter()
                .filter_map(|&a| contours.get(a))
                .map(Contour::len)
                .sum()
        };
        kept.sort_by_key(total);
        kept.drain(..groups.len() - names.len());
        kept.sort_unstable();
    } else if names.len() > groups.len() {
        warnings.push(
            ConsistencyWarning::NamesTruncated {
                groups: groups.len(),
                names: names.len(),
            }
            .emit(),
        );
        names.truncate(groups.len());
    }

    kept.into_iter()
        .zip(names)
        .map(|(g, name)| (g, groups[g].as_slice(), name))
        .collect()
}

/// Split grouped contours into one mask and image per group.
///
/// The pairing of groups and names is a best effort when their counts
/// differ and is reported through the returned warnings.
///
/// # Arguments
///
/// * `ctx` - The pipeline context, used to name the `clusters` artifacts.
/// * `img` - The image to cut, ideally already masked.
/// * `groups` - Contour indices per cluster.
/// * `contours` - The contours the groups refer to.
/// * `base` - Prefix of the output names.
/// * `names` - One name per group, the group position is used when absent.
/// * `sink` - Receives one `clusters` image per output.
pub fn split_clusters(
    ctx: PipelineContext,
    img: &Image<u8, 3>,
    groups: &[Vec<usize>],
    contours: &[Contour],
    base: &str,
    names: Option<&[String]>,
    sink: &mut dyn DiagnosticsSink,
) -> Result<ClusterSplit, PhenoError> {
    if let Some(&bad) = groups.iter().flatten().find(|&&a| a >= contours.len()) {
        return Err(PhenoError::InvalidContourIndex(bad, contours.len()));
    }

    let names = match names {
        Some(names) => names.to_vec(),
        None => (0..groups.len()).map(|i| i.to_string()).collect(),
    };
    let mut warnings = Vec::new();
    let pairs = reconcile(groups, contours, names, &mut warnings);

    let mut outputs = Vec::with_capacity(pairs.len());
    for (position, (index, group, name)) in pairs.into_iter().enumerate() {
        let mut mask = Image::from_size_val(img.size(), 0u8)?;
        for &a in group {
            fill_polygon(&mut mask, &contours[a].points, [255]);
        }
        if count_non_zero(&mask) == 0 {
            warnings.push(ConsistencyWarning::EmptyGroup { index }.emit());
            continue;
        }

        let mut image = Image::from_size_val(img.size(), 0u8)?;
        apply_mask(img, &mask, &mut image, [255, 255, 255])?;

        let name = format!("{base}_{name}_p{position}");
        log::debug!("cluster {name} from {} contours", group.len());

        if sink.enabled() {
            let artifact = ctx.artifact_name("clusters");
            report(&artifact, sink.rgb(&artifact, &image));
        }

        outputs.push(ClusterOutput { name, mask, image });
    }

    Ok(ClusterSplit { outputs, warnings })
}
