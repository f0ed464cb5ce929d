use std::path::{Path, PathBuf};

use phenocv_image::Image;

use crate::error::PhenoError;

/// Destination of the diagnostic images produced by the analysis calls.
///
/// One method per artifact kind. The name passed in already carries the
/// pipeline step, see [`crate::PipelineContext::artifact_name`]. Sinks never
/// influence the computed results.
pub trait DiagnosticsSink {
    /// Whether artifacts should be rendered at all.
    fn enabled(&self) -> bool {
        true
    }

    /// Receive a color image.
    fn rgb(&mut self, name: &str, image: &Image<u8, 3>) -> Result<(), PhenoError>;

    /// Receive a binary or grayscale image.
    fn mask(&mut self, name: &str, image: &Image<u8, 1>) -> Result<(), PhenoError>;

    /// Receive a floating point map such as a distance transform.
    fn distance_map(&mut self, name: &str, image: &Image<f32, 1>) -> Result<(), PhenoError>;
}

/// Log a failed artifact write without interrupting the analysis.
pub(crate) fn report(name: &str, result: Result<(), PhenoError>) {
    if let Err(err) = result {
        log::warn!("diagnostic artifact {name} was not written: {err}");
    }
}

/// A sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DiagnosticsSink for NoopSink {
    fn enabled(&self) -> bool {
        false
    }

    fn rgb(&mut self, _name: &str, _image: &Image<u8, 3>) -> Result<(), PhenoError> {
        Ok(())
    }

    fn mask(&mut self, _name: &str, _image: &Image<u8, 1>) -> Result<(), PhenoError> {
        Ok(())
    }

    fn distance_map(&mut self, _name: &str, _image: &Image<f32, 1>) -> Result<(), PhenoError> {
        Ok(())
    }
}

/// An artifact kept by [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    /// Color image.
    Rgb(Image<u8, 3>),
    /// Single channel image.
    Mask(Image<u8, 1>),
    /// Floating point map.
    DistanceMap(Image<f32, 1>),
}

/// A sink that keeps every artifact in memory, in arrival order.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    artifacts: Vec<(String, Artifact)>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the received artifacts in arrival order.
    pub fn names(&self) -> Vec<&str> {
        self.artifacts.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Look up the latest artifact with the given name.
    pub fn get(&self, name: &str) -> Option<&Artifact> {
        self.artifacts
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, a)| a)
    }

    /// Number of received artifacts.
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Whether no artifact was received.
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

impl DiagnosticsSink for MemorySink {
    fn rgb(&mut self, name: &str, image: &Image<u8, 3>) -> Result<(), PhenoError> {
        self.artifacts
            .push((name.to_string(), Artifact::Rgb(image.clone())));
        Ok(())
    }

    fn mask(&mut self, name: &str, image: &Image<u8, 1>) -> Result<(), PhenoError> {
        self.artifacts
            .push((name.to_string(), Artifact::Mask(image.clone())));
        Ok(())
    }

    fn distance_map(&mut self, name: &str, image: &Image<f32, 1>) -> Result<(), PhenoError> {
        self.artifacts
            .push((name.to_string(), Artifact::DistanceMap(image.clone())));
        Ok(())
    }
}

/// A sink that writes every artifact as `<dir>/<name>.png`.
#[derive(Debug, Clone)]
pub struct PngSink {
    dir: PathBuf,
}

impl PngSink {
    /// Write artifacts into `dir`, which must exist.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.png"))
    }

    fn save(
        &self,
        name: &str,
        buf: &[u8],
        width: usize,
        height: usize,
        color: image::ColorType,
    ) -> Result<(), PhenoError> {
        let path = self.path(name);
        log::debug!("writing diagnostic artifact {}", path.display());
        image::save_buffer(&path, buf, width as u32, height as u32, color)
            .map_err(|e| PhenoError::Diagnostics(format!("{}: {e}", path.display())))
    }
}

impl DiagnosticsSink for PngSink {
    fn rgb(&mut self, name: &str, image: &Image<u8, 3>) -> Result<(), PhenoError> {
        self.save(
            name,
            image.as_slice(),
            image.width(),
            image.height(),
            image::ColorType::Rgb8,
        )
    }

    fn mask(&mut self, name: &str, image: &Image<u8, 1>) -> Result<(), PhenoError> {
        self.save(
            name,
            image.as_slice(),
            image.width(),
            image.height(),
            image::ColorType::L8,
        )
    }

    fn distance_map(&mut self, name: &str, image: &Image<f32, 1>) -> Result<(), PhenoError> {
        // stretch to the full 8-bit range
        let max = image
            .as_slice()
            .iter()
            .fold(0.0f32, |acc, &v| if v.is_finite() { acc.max(v) } else { acc });
        let scale = if max > 0.0 { 255.0 / max } else { 0.0 };
        let buf: Vec<u8> = image
            .as_slice()
            .iter()
            .map(|&v| (v * scale).round().clamp(0.0, 255.0) as u8)
            .collect();
        self.save(name, &buf, image.width(), image.height(), image::ColorType::L8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phenocv_image::ImageSize;

    #[test]
    fn test_memory_sink() -> Result<(), PhenoError> {
        let mut sink = MemorySink::new();
        assert!(sink.enabled());
        assert!(sink.is_empty());

        let mask = Image::<u8, 1>::from_size_val(
            ImageSize {
                width: 2,
                height: 2,
            },
            255,
        )?;
        sink.mask("1_roi_mask", &mask)?;
        sink.distance_map("2_watershed_dist_img", &mask.cast()?)?;

        assert_eq!(sink.names(), vec!["1_roi_mask", "2_watershed_dist_img"]);
        assert_eq!(sink.get("1_roi_mask"), Some(&Artifact::Mask(mask)));
        assert!(sink.get("3_missing").is_none());
        Ok(())
    }

    #[test]
    fn test_noop_sink() {
        assert!(!NoopSink.enabled());
    }

    #[test]
    fn test_png_sink() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let mut sink = PngSink::new(dir.path());

        let size = ImageSize {
            width: 4,
            height: 3,
        };
        let rgb = Image::<u8, 3>::from_size_val(size, 128)?;
        sink.rgb("1_shapes", &rgb)?;

        let dist = Image::<f32, 1>::new(size, (0..12).map(|v| v as f32).collect())?;
        sink.distance_map("2_watershed_dist_img", &dist)?;

        let shapes = image::open(dir.path().join("1_shapes.png"))?.to_rgb8();
        assert_eq!(shapes.dimensions(), (4, 3));
        assert_eq!(shapes.get_pixel(0, 0).0, [128, 128, 128]);

        let stretched = image::open(dir.path().join("2_watershed_dist_img.png"))?.to_luma8();
        assert_eq!(stretched.get_pixel(3, 2).0, [255]);
        assert_eq!(stretched.get_pixel(0, 0).0, [0]);

        let mut missing = PngSink::new(dir.path().join("does-not-exist"));
        assert!(matches!(
            missing.mask("3_roi_mask", &Image::from_size_val(size, 0)?),
            Err(PhenoError::Diagnostics(_))
        ));

        Ok(())
    }

    #[test]
    fn test_report_swallows_errors() {
        report("1_x", Err(PhenoError::MissingThreshold));
        report("1_x", Ok(()));
    }
}
