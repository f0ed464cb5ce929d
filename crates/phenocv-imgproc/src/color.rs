use phenocv_image::{Image, ImageError};

use crate::parallel;

/// Compute the 8-bit HSV components of one RGB pixel.
///
/// Hue is halved to fit the `[0, 180)` range, saturation and value are
/// scaled to `[0, 255]`.
pub fn hsv_from_rgb_pixel(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let s = if max == 0.0 { 0.0 } else { 255.0 * delta / max };

    let h = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    [
        ((h / 2.0).round() as u16 % 180) as u8,
        s.round().clamp(0.0, 255.0) as u8,
        max as u8,
    ]
}

/// Extract one channel of the 8-bit HSV representation of an RGB image.
///
/// # Arguments
///
/// * `src` - The input RGB image.
/// * `dst` - The output single channel image.
/// * `channel` - 0 for hue, 1 for saturation, 2 for value.
///
/// # Example
///
/// ```
/// use phenocv_image::{Image, ImageSize};
/// use phenocv_imgproc::color::hsv_channel_from_rgb;
///
/// let size = ImageSize { width: 2, height: 1 };
/// let image = Image::<u8, 3>::new(size, vec![255, 0, 0, 0, 0, 128]).unwrap();
/// let mut value = Image::<u8, 1>::from_size_val(image.size(), 0).unwrap();
///
/// hsv_channel_from_rgb(&image, &mut value, 2).unwrap();
/// assert_eq!(value.as_slice(), &[255, 128]);
/// ```
pub fn hsv_channel_from_rgb(
    src: &Image<u8, 3>,
    dst: &mut Image<u8, 1>,
    channel: usize,
) -> Result<(), ImageError> {
    if channel >= 3 {
        return Err(ImageError::ChannelIndexOutOfBounds(channel, 3));
    }

    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
        dst_pixel[0] = hsv_from_rgb_pixel(src_pixel[0], src_pixel[1], src_pixel[2])[channel];
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use phenocv_image::ImageSize;

    #[test]
    fn test_hsv_pixel() {
        assert_eq!(hsv_from_rgb_pixel(255, 0, 0), [0, 255, 255]);
        assert_eq!(hsv_from_rgb_pixel(0, 255, 0), [60, 255, 255]);
        assert_eq!(hsv_from_rgb_pixel(0, 0, 255), [120, 255, 255]);
        assert_eq!(hsv_from_rgb_pixel(255, 0, 255), [150, 255, 255]);
        assert_eq!(hsv_from_rgb_pixel(0, 0, 0), [0, 0, 0]);
        assert_eq!(hsv_from_rgb_pixel(128, 128, 128), [0, 0, 128]);
    }

    #[test]
    fn test_hsv_channel() -> Result<(), ImageError> {
        let image = Image::<u8, 3>::new(
            ImageSize {
                width: 3,
                height: 1,
            },
            vec![0, 255, 0, 100, 50, 50, 10, 10, 10],
        )?;
        let mut out = Image::<u8, 1>::from_size_val(image.size(), 0)?;

        hsv_channel_from_rgb(&image, &mut out, 0)?;
        assert_eq!(out.as_slice(), &[60, 0, 0]);

        hsv_channel_from_rgb(&image, &mut out, 1)?;
        assert_eq!(out.as_slice(), &[255, 128, 0]);

        assert!(hsv_channel_from_rgb(&image, &mut out, 3).is_err());
        Ok(())
    }
}
