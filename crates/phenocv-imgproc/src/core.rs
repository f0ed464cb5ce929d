use rayon::prelude::*;

use phenocv_image::{Image, ImageError, ImageSize};

fn check_size(expected: ImageSize, got: ImageSize) -> Result<(), ImageError> {
    if expected != got {
        return Err(ImageError::InvalidImageSize(
            expected.width,
            expected.height,
            got.width,
            got.height,
        ));
    }
    Ok(())
}

/// Bitwise AND of `src1` and `src2` restricted to the non-zero pixels of `mask`.
///
/// Pixels outside `mask` are zero. With `src1 == src2` this cuts an image
/// down to a region, e.g. two binary masks intersect as
///
/// ```
/// use phenocv_image::{Image, ImageSize};
/// use phenocv_imgproc::core::bitwise_and;
///
/// let size = ImageSize { width: 4, height: 1 };
/// let objects = Image::<u8, 1>::new(size, vec![255, 255, 0, 255]).unwrap();
/// let roi = Image::<u8, 1>::new(size, vec![0, 255, 255, 255]).unwrap();
/// let mut kept = Image::<u8, 1>::from_size_val(size, 0).unwrap();
///
/// bitwise_and(&objects, &objects, &mut kept, &roi).unwrap();
/// assert_eq!(kept.as_slice(), &[0, 255, 0, 255]);
/// ```
pub fn bitwise_and<const CHANNELS: usize>(
    src1: &Image<u8, CHANNELS>,
    src2: &Image<u8, CHANNELS>,
    dst: &mut Image<u8, CHANNELS>,
    mask: &Image<u8, 1>,
) -> Result<(), ImageError> {
    check_size(src1.size(), src2.size())?;
    check_size(src1.size(), mask.size())?;
    check_size(src1.size(), dst.size())?;

    dst.as_slice_mut()
        .par_chunks_exact_mut(CHANNELS)
        .zip(src1.as_slice().par_chunks_exact(CHANNELS))
        .zip(src2.as_slice().par_chunks_exact(CHANNELS))
        .zip(mask.as_slice().par_iter())
        .for_each(|(((out, a), b), &m)| {
            for c in 0..CHANNELS {
                out[c] = if m != 0 { a[c] & b[c] } else { 0 };
            }
        });

    Ok(())
}

/// Copy the pixels of `src` selected by `mask` and paint the rest with `background`.
///
/// Used to show an object on white or black, see the cluster and marker
/// outputs.
pub fn apply_mask<const CHANNELS: usize>(
    src: &Image<u8, CHANNELS>,
    mask: &Image<u8, 1>,
    dst: &mut Image<u8, CHANNELS>,
    background: [u8; CHANNELS],
) -> Result<(), ImageError> {
    check_size(src.size(), mask.size())?;
    check_size(src.size(), dst.size())?;

    dst.as_slice_mut()
        .par_chunks_exact_mut(CHANNELS)
        .zip(src.as_slice().par_chunks_exact(CHANNELS))
        .zip(mask.as_slice().par_iter())
        .for_each(|((out, px), &m)| {
            if m != 0 {
                out.copy_from_slice(px);
            } else {
                out.copy_from_slice(&background);
            }
        });

    Ok(())
}

/// Count the non-zero pixels of a single channel image.
pub fn count_non_zero(src: &Image<u8, 1>) -> usize {
    src.as_slice().par_iter().filter(|&&v| v != 0).count()
}

/// Place two images of the same height side by side.
pub fn hconcat<const CHANNELS: usize>(
    left: &Image<u8, CHANNELS>,
    right: &Image<u8, CHANNELS>,
) -> Result<Image<u8, CHANNELS>, ImageError> {
    if left.height() != right.height() {
        return Err(ImageError::InvalidImageSize(
            left.width(),
            left.height(),
            right.width(),
            right.height(),
        ));
    }

    let size = ImageSize {
        width: left.width() + right.width(),
        height: left.height(),
    };
    let mut data = Vec::with_capacity(size.area() * CHANNELS);
    let (lw, rw) = (left.width() * CHANNELS, right.width() * CHANNELS);
    for y in 0..size.height {
        data.extend_from_slice(&left.as_slice()[y * lw..(y + 1) * lw]);
        data.extend_from_slice(&right.as_slice()[y * rw..(y + 1) * rw]);
    }

    Image::new(size, data)
}
