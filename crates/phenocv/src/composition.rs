use phenocv_image::{Image, ImageSize};
use phenocv_imgproc::{
    contours::{Contour, Point},
    draw::fill_contours,
};

use crate::error::PhenoError;

/// Several contours merged into one object.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedObject {
    /// Points of every top level contour, concatenated in index order.
    pub points: Vec<Point<i32>>,
    /// Filled mask of the object, holes stay unfilled.
    pub mask: Image<u8, 1>,
}

/// Merge the top level contours of a set into a single object.
///
/// Returns `None` when the set has no top level contour.
///
/// # Arguments
///
/// * `size` - The size of the frame the contours live in.
/// * `contours` - The contours with their nesting.
pub fn compose_objects(
    size: ImageSize,
    contours: &[Contour],
) -> Result<Option<ComposedObject>, PhenoError> {
    let points: Vec<Point<i32>> = contours
        .iter()
        .filter(|c| c.parent.is_none())
        .flat_map(|c| c.points.iter().copied())
        .collect();

    if points.is_empty() {
        return Ok(None);
    }

    let mut mask = Image::from_size_val(size, 0u8)?;
    fill_contours(&mut mask, contours, [255]);

    Ok(Some(ComposedObject { points, mask }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use phenocv_imgproc::{contours::find_contours, core::count_non_zero, draw::fill_polygon};

    #[test]
    fn test_compose_two_squares() -> Result<(), PhenoError> {
        let size = ImageSize {
            width: 20,
            height: 10,
        };
        let mut src = Image::<u8, 1>::from_size_val(size, 0)?;
        fill_polygon(&mut src, &Contour::rectangle(1, 1, 4, 4).points, [255]);
        fill_polygon(&mut src, &Contour::rectangle(10, 2, 5, 5).points, [255]);

        let contours = find_contours(&src, 0);
        let Some(composed) = compose_objects(size, &contours)? else {
            panic!("two squares compose to an object");
        };

        let total: usize = contours.iter().map(|c| c.len()).sum();
        assert_eq!(composed.points.len(), total);
        assert_eq!(count_non_zero(&composed.mask), 16 + 25);
        assert_eq!(composed.mask, src);
        Ok(())
    }

    #[test]
    fn test_compose_empty() -> Result<(), PhenoError> {
        let size = ImageSize {
            width: 4,
            height: 4,
        };
        assert!(compose_objects(size, &[])?.is_none());
        Ok(())
    }
}
