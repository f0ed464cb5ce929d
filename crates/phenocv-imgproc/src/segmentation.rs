use std::cmp::Ordering;
use std::collections::BinaryHeap;

use phenocv_image::{Image, ImageError};

/// Disjoint sets over provisional component ids, merged by union by size.
pub struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    /// `len` singleton sets.
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            size: vec![1; len],
        }
    }

    /// Append a singleton set, returning its id.
    pub fn make_set(&mut self) -> usize {
        let id = self.parent.len();
        self.parent.push(id);
        self.size.push(1);
        id
    }

    /// Root of the set holding `id`. Compresses the path on the way.
    pub fn get_representative(&mut self, mut id: usize) -> usize {
        let mut root = id;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        while self.parent[id] != root {
            let next = self.parent[id];
            self.parent[id] = root;
            id = next;
        }

        root
    }

    /// Merge the sets of `aid` and `bid`, returning the new root.
    pub fn connect(&mut self, aid: usize, bid: usize) -> usize {
        let aroot = self.get_representative(aid);
        let broot = self.get_representative(bid);

        if aroot == broot {
            return aroot;
        }

        let (big, small) = if self.size[aroot] > self.size[broot] {
            (aroot, broot)
        } else {
            (broot, aroot)
        };
        self.parent[small] = big;
        self.size[big] += self.size[small];
        big
    }

    /// Number of ids handed out.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Whether no id was handed out.
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}

/// Label the 8-connected foreground components of a mask.
///
/// # Returns
///
/// The label image, with background 0 and components numbered `1..=n` in the
/// raster order of their first pixel, together with the count `n`.
///
/// # Examples
///
/// ```
/// use phenocv_image::{Image, ImageSize};
/// use phenocv_imgproc::segmentation::label;
///
/// let mask = Image::<u8, 1>::new(ImageSize { width: 4, height: 2 }, vec![
///     255, 0, 0, 255,
///     0, 255, 0, 0,
/// ]).unwrap();
///
/// let (labels, n) = label(&mask).unwrap();
/// assert_eq!(n, 2);
/// assert_eq!(labels.as_slice(), &[1, 0, 0, 2, 0, 1, 0, 0]);
/// ```
pub fn label(mask: &Image<u8, 1>) -> Result<(Image<i32, 1>, usize), ImageError> {
    let (width, height) = (mask.width(), mask.height());
    let data = mask.as_slice();

    // provisional set id per pixel
    let mut ids = vec![usize::MAX; width * height];
    let mut uf = UnionFind::new(0);

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            if data[idx] == 0 {
                continue;
            }

            // already visited neighbours: W, NW, N, NE
            let mut neighbours = [usize::MAX; 4];
            if x > 0 {
                neighbours[0] = ids[idx - 1];
            }
            if y > 0 {
                let up = idx - width;
                if x > 0 {
                    neighbours[1] = ids[up - 1];
                }
                neighbours[2] = ids[up];
                if x + 1 < width {
                    neighbours[3] = ids[up + 1];
                }
            }

            let mut current = usize::MAX;
            for &n in neighbours.iter().filter(|&&n| n != usize::MAX) {
                current = if current == usize::MAX {
                    n
                } else {
                    uf.connect(current, n)
                };
            }
            if current == usize::MAX {
                current = uf.make_set();
            }
            ids[idx] = current;
        }
    }

    // number the components by first appearance
    let mut numbering = vec![0i32; uf.len()];
    let mut count = 0usize;
    let mut labels = Vec::with_capacity(width * height);
    for &id in ids.iter() {
        if id == usize::MAX {
            labels.push(0);
            continue;
        }
        let root = uf.get_representative(id);
        if numbering[root] == 0 {
            count += 1;
            numbering[root] = count as i32;
        }
        labels.push(numbering[root]);
    }

    Ok((Image::new(mask.size(), labels)?, count))
}

/// Sliding window maximum along rows then columns with a clamped window.
fn max_filter(src: &[f32], width: usize, height: usize, radius: usize) -> Vec<f32> {
    let mut tmp = vec![f32::NEG_INFINITY; src.len()];
    for y in 0..height {
        let row = &src[y * width..(y + 1) * width];
        for x in 0..width {
            let lo = x.saturating_sub(radius);
            let hi = (x + radius).min(width - 1);
            tmp[y * width + x] = row[lo..=hi].iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        }
    }

    let mut out = vec![f32::NEG_INFINITY; src.len()];
    for x in 0..width {
        for y in 0..height {
            let lo = y.saturating_sub(radius);
            let hi = (y + radius).min(height - 1);
            out[y * width + x] = (lo..=hi)
                .map(|j| tmp[j * width + x])
                .fold(f32::NEG_INFINITY, f32::max);
        }
    }
    out
}

/// Find the local maxima of an image.
///
/// A pixel is a peak when it equals the maximum of the `(2 * min_distance + 1)`
/// square window around it and is strictly larger than both the image minimum
/// and `threshold_rel` times the image maximum. Flat maxima mark every pixel
/// of the plateau.
///
/// # Arguments
///
/// * `src` - The input image, e.g. a distance map.
/// * `dst` - The output mask, 255 on peaks and 0 elsewhere.
/// * `min_distance` - Half size of the comparison window.
/// * `threshold_rel` - Minimum intensity of peaks relative to the image maximum.
/// * `exclude_border` - Discard peaks closer than `min_distance` to the border.
pub fn peak_local_max(
    src: &Image<f32, 1>,
    dst: &mut Image<u8, 1>,
    min_distance: usize,
    threshold_rel: f32,
    exclude_border: bool,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let (width, height) = (src.width(), src.height());
    let data = src.as_slice();
    let out = dst.as_slice_mut();
    out.fill(0);
    if data.is_empty() {
        return Ok(());
    }

    let (min, max) = data
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let threshold = min.max(threshold_rel * max);

    let filtered = max_filter(data, width, height, min_distance);
    let border = if exclude_border { min_distance } else { 0 };

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let inside = x >= border
                && y >= border
                && x + border < width
                && y + border < height;
            if inside && data[idx] == filtered[idx] && data[idx] > threshold {
                out[idx] = 255;
            }
        }
    }

    Ok(())
}

#[derive(Debug)]
struct FloodEntry {
    value: f32,
    age: u64,
    index: usize,
}

impl PartialEq for FloodEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloodEntry {}

impl PartialOrd for FloodEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloodEntry {
    // reversed so that the max-heap pops the lowest value, oldest first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .value
            .total_cmp(&self.value)
            .then_with(|| other.age.cmp(&self.age))
    }
}

/// Flood the image from the markers with the watershed transform.
///
/// Pixels are visited lowest value first and among equal values in insertion
/// order; every unlabelled 4-connected neighbour inside the mask takes the
/// label of the pixel that reached it.
///
/// # Arguments
///
/// * `src` - The relief to flood, e.g. a negated distance map.
/// * `markers` - Seed labels, 0 for unlabelled pixels.
/// * `mask` - Only non-zero mask pixels are labelled.
///
/// # Returns
///
/// The label image, 0 outside the mask and in regions no marker reaches.
pub fn watershed(
    src: &Image<f32, 1>,
    markers: &Image<i32, 1>,
    mask: &Image<u8, 1>,
) -> Result<Image<i32, 1>, ImageError> {
    for size in [markers.size(), mask.size()] {
        if size != src.size() {
            return Err(ImageError::InvalidImageSize(
                src.cols(),
                src.rows(),
                size.width,
                size.height,
            ));
        }
    }

    let (width, height) = (src.width(), src.height());
    let relief = src.as_slice();
    let allowed = mask.as_slice();

    let mut labels: Vec<i32> = markers
        .as_slice()
        .iter()
        .zip(allowed.iter())
        .map(|(&m, &a)| if a != 0 { m } else { 0 })
        .collect();

    let mut heap = BinaryHeap::new();
    let mut age = 0u64;
    for (index, &l) in labels.iter().enumerate() {
        if l != 0 {
            heap.push(FloodEntry {
                value: relief[index],
                age,
                index,
            });
            age += 1;
        }
    }

    while let Some(FloodEntry { index, .. }) = heap.pop() {
        let (x, y) = (index % width, index / width);
        let current = labels[index];

        let neighbours = [
            (x > 0).then(|| index - 1),
            (x + 1 < width).then(|| index + 1),
            (y > 0).then(|| index - width),
            (y + 1 < height).then(|| index + width),
        ];

        for n in neighbours.into_iter().flatten() {
            if labels[n] == 0 && allowed[n] != 0 {
                labels[n] = current;
                heap.push(FloodEntry {
                    value: relief[n],
                    age,
                    index: n,
                });
                age += 1;
            }
        }
    }

    Image::new(src.size(), labels)
}
