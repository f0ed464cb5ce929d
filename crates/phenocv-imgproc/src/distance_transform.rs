use phenocv_image::{Image, ImageError};

// stands in for infinity so that the envelope intersections stay finite
const FAR: f64 = 1e20;

/// Squared distance transform of a sampled function in one dimension.
///
/// Lower envelope of parabolas as described by Felzenszwalb and Huttenlocher,
/// "Distance Transforms of Sampled Functions".
fn edt_1d(f: &[f64], d: &mut [f64], v: &mut [usize], z: &mut [f64]) {
    let n = f.len();
    if n == 0 {
        return;
    }

    let mut k = 0usize;
    v[0] = 0;
    z[0] = f64::NEG_INFINITY;
    z[1] = f64::INFINITY;

    for q in 1..n {
        let fq = f[q] + (q * q) as f64;
        let mut s;
        loop {
            let vk = v[k];
            s = (fq - (f[vk] + (vk * vk) as f64)) / (2.0 * (q as f64 - vk as f64));
            if s > z[k] || k == 0 {
                break;
            }
            k -= 1;
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = f64::INFINITY;
    }

    k = 0;
    for (q, dq) in d.iter_mut().enumerate().take(n) {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let dist = q as f64 - v[k] as f64;
        *dq = dist * dist + f[v[k]];
    }
}

/// Compute the exact euclidean distance transform of a binary mask.
///
/// Every foreground (non-zero) pixel gets its distance to the nearest
/// background pixel, background pixels are zero. Pixels beyond the image
/// frame are not treated as background.
///
/// # Arguments
///
/// * `src` - The binary mask.
/// * `dst` - The output distance map with the same size as the mask.
///
/// # Examples
///
/// ```
/// use phenocv_image::{Image, ImageSize};
/// use phenocv_imgproc::distance_transform::distance_transform;
///
/// let size = ImageSize { width: 5, height: 1 };
/// let mask = Image::<u8, 1>::new(size, vec![0, 255, 255, 255, 255]).unwrap();
/// let mut dist = Image::<f32, 1>::from_size_val(mask.size(), 0.0).unwrap();
/// distance_transform(&mask, &mut dist).unwrap();
///
/// assert_eq!(dist.as_slice(), &[0.0, 1.0, 2.0, 3.0, 4.0]);
/// ```
pub fn distance_transform(src: &Image<u8, 1>, dst: &mut Image<f32, 1>) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let (width, height) = (src.width(), src.height());
    if width == 0 || height == 0 {
        return Ok(());
    }

    let mut grid: Vec<f64> = src
        .as_slice()
        .iter()
        .map(|&v| if v == 0 { 0.0 } else { FAR })
        .collect();

    let len = width.max(height);
    let mut f = vec![0.0; len];
    let mut d = vec![0.0; len];
    let mut v = vec![0usize; len];
    let mut z = vec![0.0; len + 1];

    // columns
    for x in 0..width {
        for y in 0..height {
            f[y] = grid[y * width + x];
        }
        edt_1d(&f[..height], &mut d[..height], &mut v, &mut z);
        for y in 0..height {
            grid[y * width + x] = d[y];
        }
    }

    // rows
    for row in grid.chunks_exact_mut(width) {
        f[..width].copy_from_slice(row);
        edt_1d(&f[..width], &mut d[..width], &mut v, &mut z);
        row.copy_from_slice(&d[..width]);
    }

    dst.as_slice_mut()
        .iter_mut()
        .zip(grid.iter())
        .for_each(|(out, &sq)| *out = sq.sqrt() as f32);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use phenocv_image::ImageSize;

    fn brute_force(mask: &Image<u8, 1>) -> Vec<f32> {
        let (w, h) = (mask.width(), mask.height());
        let data = mask.as_slice();
        let mut out = vec![0.0f32; w * h];
        for y in 0..h {
            for x in 0..w {
                if data[y * w + x] == 0 {
                    continue;
                }
                let mut best = f32::MAX;
                for j in 0..h {
                    for i in 0..w {
                        if data[j * w + i] == 0 {
                            let dx = x as f32 - i as f32;
                            let dy = y as f32 - j as f32;
                            best = best.min((dx * dx + dy * dy).sqrt());
                        }
                    }
                }
                out[y * w + x] = best;
            }
        }
        out
    }

    #[test]
    fn test_distance_transform_matches_brute_force() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 12,
            height: 9,
        };
        let mut mask = Image::<u8, 1>::from_size_val(size, 0)?;
        for y in 1..8 {
            for x in 1..11 {
                if (x, y) != (6, 4) {
                    mask.set_pixel(x, y, 0, 255)?;
                }
            }
        }
        mask.set_pixel(0, 4, 0, 255)?;

        let mut dist = Image::<f32, 1>::from_size_val(size, 0.0)?;
        distance_transform(&mask, &mut dist)?;

        for (got, want) in dist.as_slice().iter().zip(brute_force(&mask).iter()) {
            assert_relative_eq!(got, want, epsilon = 1e-5);
        }
        Ok(())
    }

    #[test]
    fn test_distance_transform_size_mismatch() -> Result<(), ImageError> {
        let mask = Image::<u8, 1>::from_size_val(
            ImageSize {
                width: 3,
                height: 3,
            },
            255,
        )?;
        let mut dist = Image::<f32, 1>::from_size_val(
            ImageSize {
                width: 2,
                height: 3,
            },
            0.0,
        )?;
        assert!(distance_transform(&mask, &mut dist).is_err());
        Ok(())
    }
}
