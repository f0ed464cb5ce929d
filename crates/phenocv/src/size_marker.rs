use std::str::FromStr;

use phenocv_image::Image;
use phenocv_imgproc::{
    color::hsv_channel_from_rgb,
    contours::{Contour, ContourSource},
    core::apply_mask,
    draw::draw_contours,
    ellipse::fit_ellipse,
    moments::moments,
    threshold::{threshold_binary, threshold_binary_inverse},
};
use serde::{Deserialize, Serialize};

use crate::{
    composition::compose_objects,
    context::PipelineContext,
    diagnostics::{report, DiagnosticsSink},
    error::PhenoError,
    record::{Field, Record},
    roi::{classify_objects, roi_mask, RoiPolicy},
};

const MARKER_COLOR: [u8; 3] = [0, 0, 255];

/// How the marker is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerMode {
    /// The ROI itself is the marker.
    Define,
    /// The marker is thresholded inside the ROI.
    Detect,
}

impl FromStr for MarkerMode {
    type Err = PhenoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "define" => Ok(Self::Define),
            "detect" => Ok(Self::Detect),
            _ => Err(PhenoError::InvalidMarkerMode(s.to_string())),
        }
    }
}

/// Whether the marker is darker or lighter than its surroundings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectColor {
    /// Keep pixels at or below the threshold.
    Dark,
    /// Keep pixels above the threshold.
    Light,
}

impl FromStr for ObjectColor {
    type Err = PhenoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dark" => Ok(Self::Dark),
            "light" => Ok(Self::Light),
            _ => Err(PhenoError::InvalidObjectColor(s.to_string())),
        }
    }
}

/// Channel of the HSV color space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HsvChannel {
    /// Hue.
    H,
    /// Saturation.
    S,
    /// Value.
    V,
}

impl HsvChannel {
    /// Index of the channel in an HSV pixel.
    pub fn index(self) -> usize {
        match self {
            Self::H => 0,
            Self::S => 1,
            Self::V => 2,
        }
    }
}

impl FromStr for HsvChannel {
    type Err = PhenoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "h" => Ok(Self::H),
            "s" => Ok(Self::S),
            "v" => Ok(Self::V),
            _ => Err(PhenoError::InvalidChannel(s.to_string())),
        }
    }
}

/// Parameters of the marker search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeMarkerParams {
    /// How the marker is located.
    pub mode: MarkerMode,
    /// Whether the marker is dark or light, detect mode only.
    pub object_color: ObjectColor,
    /// Channel to threshold, required in detect mode.
    pub channel: Option<HsvChannel>,
    /// Threshold value, required in detect mode.
    pub threshold: Option<u8>,
}

impl Default for SizeMarkerParams {
    fn default() -> Self {
        Self {
            mode: MarkerMode::Define,
            object_color: ObjectColor::Dark,
            channel: None,
            threshold: None,
        }
    }
}

/// Size of a calibration marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizeMarker {
    /// Pixel area of the marker.
    pub area: f64,
    /// Major axis of the fitted ellipse.
    pub major_axis_length: f64,
    /// Minor axis of the fitted ellipse.
    pub minor_axis_length: f64,
    /// Eccentricity of the fitted ellipse.
    pub eccentricity: f64,
}

impl Record for SizeMarker {
    fn headers() -> &'static [&'static str] {
        &[
            "marker_area",
            "marker_major_axis_length",
            "marker_minor_axis_length",
            "marker_eccentricity",
        ]
    }

    fn values(&self) -> Vec<Field> {
        vec![
            Field::Float(self.area),
            Field::Float(self.major_axis_length),
            Field::Float(self.minor_axis_length),
            Field::Float(self.eccentricity),
        ]
    }
}

/// Threshold one HSV channel of the image inside the ROI.
fn threshold_marker(
    img: &Image<u8, 3>,
    roi_raster: &Image<u8, 1>,
    channel: HsvChannel,
    threshold: u8,
    color: ObjectColor,
) -> Result<Image<u8, 1>, PhenoError> {
    let mut masked = Image::from_size_val(img.size(), 0u8)?;
    apply_mask(img, roi_raster, &mut masked, [0, 0, 0])?;

    let mut gray = Image::from_size_val(img.size(), 0u8)?;
    hsv_channel_from_rgb(&masked, &mut gray, channel.index())?;

    let mut binary = Image::from_size_val(img.size(), 0u8)?;
    match color {
        ObjectColor::Dark => threshold_binary_inverse(&gray, &mut binary, threshold, 255)?,
        ObjectColor::Light => threshold_binary(&gray, &mut binary, threshold, 255)?,
    }
    Ok(binary)
}

/// Measure a calibration marker inside a region of interest.
///
/// In define mode the ROI is the marker. In detect mode the image is masked
/// to the ROI, one HSV channel is thresholded and the objects partially
/// inside the ROI are combined into the marker.
///
/// # Arguments
///
/// * `ctx` - The pipeline context, used to name the artifacts.
/// * `img` - The image holding the marker.
/// * `roi` - The ROI contours with their nesting.
/// * `params` - The marker search parameters.
/// * `source` - Traces contours of the intermediate masks.
/// * `sink` - Receives `marker_shape`, plus the ROI artifacts in detect mode.
///
/// # Returns
///
/// `None` when no marker is found or no ellipse fits it.
pub fn report_size_marker<S: ContourSource + ?Sized>(
    ctx: PipelineContext,
    img: &Image<u8, 3>,
    roi: &[Contour],
    params: &SizeMarkerParams,
    source: &S,
    sink: &mut dyn DiagnosticsSink,
) -> Result<Option<SizeMarker>, PhenoError> {
    let roi_raster = roi_mask(img.size(), roi)?;

    let contours = match params.mode {
        MarkerMode::Define => source.find_contours(&roi_raster),
        MarkerMode::Detect => {
            let (Some(channel), Some(threshold)) = (params.channel, params.threshold) else {
                return Err(PhenoError::MissingThreshold);
            };
            let binary =
                threshold_marker(img, &roi_raster, channel, threshold, params.object_color)?;
            let objects = source.find_contours(&binary);
            classify_objects(ctx, img, roi, &objects, RoiPolicy::Partial, source, sink)?.contours
        }
    };

    let Some(marker) = compose_objects(img.size(), &contours)? else {
        log::warn!("no size marker found");
        return Ok(None);
    };
    let Some(ellipse) = fit_ellipse(&marker.points) else {
        log::warn!("no ellipse fits the size marker");
        return Ok(None);
    };

    let size = SizeMarker {
        area: moments(&marker.mask).m00,
        major_axis_length: ellipse.major_axis(),
        minor_axis_length: ellipse.minor_axis(),
        eccentricity: ellipse.eccentricity(),
    };
    log::debug!("size marker area {}", size.area);

    if sink.enabled() {
        let mut overlay = img.clone();
        let outer: Vec<Contour> = contours.into_iter().filter(|c| c.parent.is_none()).collect();
        draw_contours(&mut overlay, &outer, MARKER_COLOR, ctx.line_thickness);
        let name = ctx.artifact_name("marker_shape");
        report(&name, sink.rgb(&name, &overlay));
    }

    Ok(Some(size))
}
