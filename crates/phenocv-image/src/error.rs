/// An error type for the image module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    /// Error when channel and shape are not valid.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidChannelShape(usize, usize),

    /// Error when the image sizes of two images do not match.
    #[error("Image size ({0}x{1}) does not match the expected size ({2}x{3})")]
    InvalidImageSize(usize, usize, usize, usize),

    /// Error when the pixel coordinates are outside the image.
    #[error("Pixel ({0}, {1}) is out of bounds for an image of size {2}x{3}")]
    PixelIndexOutOfBounds(usize, usize, usize, usize),

    /// Error when the channel index is out of bounds.
    #[error("Channel index {0} is out of bounds ({1})")]
    ChannelIndexOutOfBounds(usize, usize),

    /// Error when a value cannot be represented in the target type.
    #[error("Failed to cast image data to {0}")]
    CastError(String),
}
