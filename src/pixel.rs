//! RGBA pixel buffer shared by the detector and the inpainter.
//!
//! The buffer wraps an [`RgbaImage`] so decoding and encoding go through the
//! `image` crate, while the algorithms index the interleaved bytes directly.

use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, Rgba, RgbaImage};

use crate::error::{Error, Result};

/// Bytes per RGBA pixel.
pub const CHANNELS: usize = 4;

/// An in-memory RGBA raster with interleaved 8-bit samples.
///
/// The byte length is always `width * height * 4` and both dimensions are
/// non-zero. The buffer is never resized after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl PixelBuffer {
    /// Wrap raw interleaved RGBA bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyImage`] for a zero dimension and
    /// [`Error::BufferSize`] if `data` is not exactly `width * height * 4` bytes.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        check_dimensions(width, height)?;
        let expected = width as usize * height as usize * CHANNELS;
        let actual = data.len();
        if actual != expected {
            return Err(Error::BufferSize { expected, actual });
        }
        let image =
            RgbaImage::from_raw(width, height, data).ok_or(Error::BufferSize { expected, actual })?;
        Ok(Self { image })
    }

    /// Create a buffer where every pixel has the same RGBA value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyImage`] for a zero dimension.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            image: RgbaImage::from_pixel(width, height, Rgba(rgba)),
        })
    }

    /// Decode an encoded image (PNG, JPEG, WebP, BMP, ...) into RGBA.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the bytes are not a supported raster and
    /// [`Error::EmptyImage`] if the decoded image has zero area.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes).map_err(Error::Decode)?;
        Self::try_from(decoded.to_rgba8())
    }

    /// Read and decode an image file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise the same
    /// errors as [`PixelBuffer::decode`].
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::decode(&bytes)
    }

    /// Encode the buffer as PNG.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Image`] if encoding fails.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.image.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// `(width, height)` in pixels.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// RGBA value at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the buffer.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    /// Overwrite the RGBA value at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the buffer.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        self.image.put_pixel(x, y, Rgba(rgba));
    }

    /// The interleaved RGBA bytes, row-major.
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub(crate) fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.image
    }

    /// Borrow the underlying `image` buffer.
    #[must_use]
    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    /// Consume the buffer, returning the underlying `image` buffer.
    #[must_use]
    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Number of bytes in one row.
    pub(crate) fn stride(&self) -> usize {
        self.image.width() as usize * CHANNELS
    }

    /// Byte offset of the pixel at `(x, y)`.
    pub(crate) fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.stride() + x as usize * CHANNELS
    }
}

impl TryFrom<RgbaImage> for PixelBuffer {
    type Error = Error;

    fn try_from(image: RgbaImage) -> Result<Self> {
        check_dimensions(image.width(), image.height())?;
        Ok(Self { image })
    }
}

impl From<PixelBuffer> for RgbaImage {
    fn from(buffer: PixelBuffer) -> Self {
        buffer.image
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::EmptyImage { width, height });
    }
    Ok(())
}
