//! Error types for the watermark-inpaint crate.

/// Errors that can occur during region detection and removal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input bytes could not be decoded as a raster image.
    #[error("failed to decode image: {0}")]
    Decode(image::ImageError),

    /// The image has zero width or height.
    #[error("image has zero area ({width}x{height})")]
    EmptyImage {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },

    /// A raw RGBA buffer does not hold exactly `width * height * 4` bytes.
    #[error("RGBA buffer length mismatch: expected {expected} bytes, got {actual}")]
    BufferSize {
        /// Expected byte length.
        expected: usize,
        /// Actual byte length.
        actual: usize,
    },

    /// A region denormalizes to an empty pixel rectangle.
    #[error("region {x},{y} {width}x{height} is empty on a {image_width}x{image_height} image")]
    OutOfBounds {
        /// Left edge in pixels.
        x: u32,
        /// Top edge in pixels.
        y: u32,
        /// Width in pixels after clipping.
        width: u32,
        /// Height in pixels after clipping.
        height: u32,
        /// Width of the target image.
        image_width: u32,
        /// Height of the target image.
        image_height: u32,
    },

    /// Processing was cancelled between two regions.
    #[error("cancelled after {completed} of {total} regions")]
    Cancelled {
        /// Regions fully processed before cancellation.
        completed: usize,
        /// Regions requested.
        total: usize,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The output image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred while encoding or saving an image.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
