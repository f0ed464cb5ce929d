use num_traits::Zero;

use phenocv_image::{Image, ImageError};

use crate::parallel;

/// Set every sample above `threshold` to `max_value` and the rest to zero.
///
/// ```
/// use phenocv_image::{Image, ImageSize};
/// use phenocv_imgproc::threshold::threshold_binary;
///
/// let size = ImageSize { width: 3, height: 1 };
/// let value = Image::<u8, 1>::new(size, vec![40, 90, 200]).unwrap();
/// let mut mask = Image::<u8, 1>::from_size_val(size, 0).unwrap();
///
/// threshold_binary(&value, &mut mask, 90, 255).unwrap();
/// assert_eq!(mask.as_slice(), &[0, 0, 255]);
/// ```
pub fn threshold_binary<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    threshold: T,
    max_value: T,
) -> Result<(), ImageError>
where
    T: Copy + Send + Sync + PartialOrd + Zero,
{
    binarize(src, dst, threshold, max_value, T::zero())
}

/// Set every sample above `threshold` to zero and the rest to `max_value`.
///
/// Used to segment objects darker than their background.
pub fn threshold_binary_inverse<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    threshold: T,
    max_value: T,
) -> Result<(), ImageError>
where
    T: Copy + Send + Sync + PartialOrd + Zero,
{
    binarize(src, dst, threshold, T::zero(), max_value)
}

fn binarize<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    threshold: T,
    above: T,
    below: T,
) -> Result<(), ImageError>
where
    T: Copy + Send + Sync + PartialOrd,
{
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    parallel::par_iter_rows_val(src, dst, |v, out| {
        *out = if *v > threshold { above } else { below };
    });

    Ok(())
}
