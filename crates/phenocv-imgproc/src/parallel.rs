use rayon::prelude::*;

use phenocv_image::Image;

/// Map every pixel of `src` into the pixel at the same position in `dst`.
///
/// Rows are processed in parallel. `dst` must have the size of `src`.
pub fn par_iter_rows<T1, const C1: usize, T2, const C2: usize>(
    src: &Image<T1, C1>,
    dst: &mut Image<T2, C2>,
    f: impl Fn(&[T1], &mut [T2]) + Send + Sync,
) where
    T1: Clone + Send + Sync,
    T2: Clone + Send + Sync,
{
    let cols = src.cols();
    if cols == 0 {
        return;
    }

    src.as_slice()
        .par_chunks_exact(C1 * cols)
        .zip(dst.as_slice_mut().par_chunks_exact_mut(C2 * cols))
        .for_each(|(row, out)| {
            for (px, out_px) in row.chunks_exact(C1).zip(out.chunks_exact_mut(C2)) {
                f(px, out_px);
            }
        });
}

/// Like [`par_iter_rows`] but visits single samples, for operators that
/// treat every channel alike.
pub fn par_iter_rows_val<T1, const C1: usize, T2, const C2: usize>(
    src: &Image<T1, C1>,
    dst: &mut Image<T2, C2>,
    f: impl Fn(&T1, &mut T2) + Send + Sync,
) where
    T1: Clone + Send + Sync,
    T2: Clone + Send + Sync,
{
    let cols = src.cols();
    if cols == 0 {
        return;
    }

    src.as_slice()
        .par_chunks_exact(C1 * cols)
        .zip(dst.as_slice_mut().par_chunks_exact_mut(C2 * cols))
        .for_each(|(row, out)| {
            for (v, out_v) in row.iter().zip(out.iter_mut()) {
                f(v, out_v);
            }
        });
}
