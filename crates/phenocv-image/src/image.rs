use crate::error::ImageError;

/// Width and height of a raster in pixels.
///
/// ```
/// use phenocv_image::ImageSize;
///
/// let plate = ImageSize { width: 640, height: 480 };
/// assert_eq!(plate.area(), 307_200);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageSize {
    /// Number of columns.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
}

impl ImageSize {
    /// Number of pixels covered by the size.
    pub fn area(&self) -> usize {
        self.width * self.height
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A raster of `CHANNELS` interleaved samples per pixel.
///
/// Samples are stored row-major, channel `c` of `(x, y)` lives at
/// `(y * width + x) * CHANNELS + c`. Binary masks are `Image<u8, 1>` holding
/// 0 or 255, color images are `Image<u8, 3>` in RGB order.
#[derive(Clone, Debug, PartialEq)]
pub struct Image<T, const CHANNELS: usize> {
    size: ImageSize,
    data: Vec<T>,
}

impl<T, const CHANNELS: usize> Image<T, CHANNELS> {
    /// Wrap a sample buffer.
    ///
    /// # Errors
    ///
    /// [`ImageError::InvalidChannelShape`] when `data` does not hold exactly
    /// `width * height * CHANNELS` samples.
    ///
    /// ```
    /// use phenocv_image::{Image, ImageSize};
    ///
    /// let size = ImageSize { width: 2, height: 2 };
    /// let mask = Image::<u8, 1>::new(size, vec![0, 255, 255, 0]).unwrap();
    /// assert_eq!(mask.pixel(1, 0), Some(&[255u8][..]));
    /// ```
    pub fn new(size: ImageSize, data: Vec<T>) -> Result<Self, ImageError> {
        let expected = size.area() * CHANNELS;
        if data.len() != expected {
            return Err(ImageError::InvalidChannelShape(data.len(), expected));
        }
        Ok(Self { size, data })
    }

    /// An image with every sample set to `val`.
    pub fn from_size_val(size: ImageSize, val: T) -> Result<Self, ImageError>
    where
        T: Clone,
    {
        Image::new(size, vec![val; size.area() * CHANNELS])
    }

    /// The size in pixels.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.size.width
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.size.height
    }

    /// Alias of [`Image::cols`].
    pub fn width(&self) -> usize {
        self.size.width
    }

    /// Alias of [`Image::rows`].
    pub fn height(&self) -> usize {
        self.size.height
    }

    /// All samples, row-major.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// All samples, row-major, mutable.
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Whether the signed coordinates `(x, y)` fall inside the image.
    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.size.width && (y as usize) < self.size.height
    }

    #[inline]
    fn offset(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.size.width && y < self.size.height).then(|| (y * self.size.width + x) * CHANNELS)
    }

    /// The samples of the pixel at `(x, y)`, `None` outside the image.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Option<&[T]> {
        let start = self.offset(x, y)?;
        Some(&self.data[start..start + CHANNELS])
    }

    /// Mutable samples of the pixel at `(x, y)`, `None` outside the image.
    #[inline]
    pub fn pixel_mut(&mut self, x: usize, y: usize) -> Option<&mut [T]> {
        let start = self.offset(x, y)?;
        Some(&mut self.data[start..start + CHANNELS])
    }

    fn checked_index(&self, x: usize, y: usize, ch: usize) -> Result<usize, ImageError> {
        let start = self.offset(x, y).ok_or(ImageError::PixelIndexOutOfBounds(
            x,
            y,
            self.size.width,
            self.size.height,
        ))?;
        if ch >= CHANNELS {
            return Err(ImageError::ChannelIndexOutOfBounds(ch, CHANNELS));
        }
        Ok(start + ch)
    }

    /// Read channel `ch` of the pixel at `(x, y)`.
    ///
    /// # Errors
    ///
    /// When the pixel or the channel is out of bounds.
    pub fn get_pixel(&self, x: usize, y: usize, ch: usize) -> Result<&T, ImageError> {
        let idx = self.checked_index(x, y, ch)?;
        Ok(&self.data[idx])
    }

    /// Write channel `ch` of the pixel at `(x, y)`.
    ///
    /// # Errors
    ///
    /// When the pixel or the channel is out of bounds.
    pub fn set_pixel(&mut self, x: usize, y: usize, ch: usize, val: T) -> Result<(), ImageError> {
        let idx = self.checked_index(x, y, ch)?;
        self.data[idx] = val;
        Ok(())
    }

    /// Convert every sample to `U`.
    ///
    /// # Errors
    ///
    /// [`ImageError::CastError`] when a sample does not fit in `U`.
    pub fn cast<U>(&self) -> Result<Image<U, CHANNELS>, ImageError>
    where
        U: num_traits::NumCast,
        T: num_traits::NumCast + Copy,
    {
        let data = self
            .data
            .iter()
            .map(|&v| {
                U::from(v).ok_or_else(|| ImageError::CastError(std::any::type_name::<U>().into()))
            })
            .collect::<Result<Vec<U>, ImageError>>()?;
        Image::new(self.size, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(width: usize, height: usize) -> ImageSize {
        ImageSize { width, height }
    }

    #[test]
    fn test_size() {
        let s = size(10, 20);
        assert_eq!(s.area(), 200);
        assert_eq!(s.to_string(), "10x20");
    }

    #[test]
    fn test_wrong_length() {
        let image = Image::<u8, 1>::new(size(3, 3), vec![0u8; 8]);
        assert_eq!(image, Err(ImageError::InvalidChannelShape(8, 9)));
    }

    #[test]
    fn test_pixel_access() -> Result<(), ImageError> {
        let mut image = Image::<u8, 3>::from_size_val(size(4, 2), 0)?;
        image.set_pixel(3, 1, 2, 200)?;

        assert_eq!(image.get_pixel(3, 1, 2)?, &200);
        assert_eq!(image.pixel(3, 1), Some(&[0u8, 0, 200][..]));
        assert_eq!(image.pixel(4, 1), None);
        assert_eq!(
            image.get_pixel(4, 0, 0),
            Err(ImageError::PixelIndexOutOfBounds(4, 0, 4, 2))
        );
        assert_eq!(
            image.set_pixel(0, 0, 3, 1),
            Err(ImageError::ChannelIndexOutOfBounds(3, 3))
        );

        if let Some(px) = image.pixel_mut(0, 0) {
            px.copy_from_slice(&[1, 2, 3]);
        }
        assert_eq!(&image.as_slice()[..3], &[1, 2, 3]);

        assert!(image.contains(3, 1));
        assert!(!image.contains(-1, 0));
        assert!(!image.contains(0, 2));
        Ok(())
    }

    #[test]
    fn test_cast() -> Result<(), ImageError> {
        let labels = Image::<i32, 1>::new(size(2, 1), vec![-1, 5])?;
        assert!(labels.cast::<u8>().is_err());

        let dist: Image<f64, 1> = labels.cast()?;
        assert_eq!(dist.as_slice(), &[-1.0, 5.0]);
        Ok(())
    }
}
