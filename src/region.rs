//! Normalized regions and the pixel rectangles they map to.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Slack added before flooring so that float noise in a normalized
/// coordinate (`0.29 * 100 = 28.999...`) lands on the intended pixel.
const DENORMALIZE_TOLERANCE: f64 = 1e-3;

/// Where a region came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    /// Drawn by the user.
    Manual,
    /// Produced by the detector.
    Auto,
}

/// A rectangle in normalized image coordinates.
///
/// All fields are in `[0, 1]` relative to the image size, and the rectangle
/// never extends past the right or bottom edge. Out-of-range input is clamped
/// at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    kind: RegionKind,
}

impl Region {
    /// Create a region, clamping it into the unit square.
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64, kind: RegionKind) -> Self {
        let x = unit(x);
        let y = unit(y);
        Self {
            x,
            y,
            width: unit(width).min(1.0 - x),
            height: unit(height).min(1.0 - y),
            kind,
        }
    }

    /// Create a user-drawn region.
    #[must_use]
    pub fn manual(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, width, height, RegionKind::Manual)
    }

    /// Create a detector-produced region.
    #[must_use]
    pub fn auto(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, width, height, RegionKind::Auto)
    }

    /// Normalize a pixel rectangle against an image of the given size.
    #[must_use]
    pub fn from_pixel_rect(
        rect: PixelRect,
        image_width: u32,
        image_height: u32,
        kind: RegionKind,
    ) -> Self {
        let w = f64::from(image_width.max(1));
        let h = f64::from(image_height.max(1));
        Self::new(
            f64::from(rect.x) / w,
            f64::from(rect.y) / h,
            f64::from(rect.width) / w,
            f64::from(rect.height) / h,
            kind,
        )
    }

    /// Left edge, normalized.
    #[must_use]
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Top edge, normalized.
    #[must_use]
    pub fn y(&self) -> f64 {
        self.y
    }

    /// Width, normalized.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Height, normalized.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Origin of the region.
    #[must_use]
    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    /// Map the region onto an image of the given size.
    ///
    /// Each coordinate is `floor(coord * dimension)`; the result is clipped
    /// to the image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if the rectangle has zero width or height.
    pub fn to_pixel_rect(&self, image_width: u32, image_height: u32) -> Result<PixelRect> {
        let x = denormalize(self.x, image_width);
        let y = denormalize(self.y, image_height);
        let width = denormalize(self.width, image_width).min(image_width - x);
        let height = denormalize(self.height, image_height).min(image_height - y);

        if width == 0 || height == 0 {
            return Err(Error::OutOfBounds {
                x,
                y,
                width,
                height,
                image_width,
                image_height,
            });
        }

        Ok(PixelRect::new(x, y, width, height))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

/// Error returned when parsing a [`Region`] from `"x,y,width,height"`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid region {0:?}: expected x,y,width,height with values in [0, 1]")]
pub struct ParseRegionError(String);

impl FromStr for Region {
    type Err = ParseRegionError;

    /// Parse a manual region from four comma-separated normalized values.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let err = || ParseRegionError(s.to_string());
        let values = s
            .split(',')
            .map(|part| part.trim().parse::<f64>().map_err(|_| err()))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let [x, y, width, height] = values[..] else {
            return Err(err());
        };
        if !values.iter().all(|v| (0.0..=1.0).contains(v)) {
            return Err(err());
        }

        Ok(Self::manual(x, y, width, height))
    }
}

/// An axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelRect {
    /// Create a rectangle from its top-left corner and size.
    #[must_use]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// One past the rightmost column.
    #[must_use]
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// One past the bottom row.
    #[must_use]
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Number of pixels covered.
    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Whether `(x, y)` lies inside the rectangle.
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.x..self.right()).contains(&x) && (self.y..self.bottom()).contains(&y)
    }

    /// Grow by `margin` on every side, clipped to a `width` x `height` image.
    #[must_use]
    pub fn expand(&self, margin: u32, width: u32, height: u32) -> Self {
        let x = self.x.saturating_sub(margin);
        let y = self.y.saturating_sub(margin);
        let right = self.right().saturating_add(margin).min(width);
        let bottom = self.bottom().saturating_add(margin).min(height);
        Self::new(x, y, right.saturating_sub(x), bottom.saturating_sub(y))
    }

    /// Smallest rectangle covering both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self::new(x, y, right - x, bottom - y)
    }
}

fn unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn denormalize(coord: f64, dimension: u32) -> u32 {
    let scaled = (coord * f64::from(dimension) + DENORMALIZE_TOLERANCE).floor();
    scaled.clamp(0.0, f64::from(dimension)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clamps_into_unit_square() {
        let r = Region::manual(-0.5, 0.25, 2.0, 0.9);
        assert!(r.x().abs() < f64::EPSILON);
        assert!((r.y() - 0.25).abs() < f64::EPSILON);
        assert!((r.width() - 1.0).abs() < f64::EPSILON);
        assert!(r.y() + r.height() <= 1.0);
        assert_eq!(r.kind(), RegionKind::Manual);
    }

    #[test]
    fn nan_coordinates_collapse_to_zero() {
        let r = Region::auto(f64::NAN, 0.5, 0.5, f64::NAN);
        assert!(r.x().abs() < f64::EPSILON);
        assert!(r.height().abs() < f64::EPSILON);
        assert_eq!(r.kind(), RegionKind::Auto);
    }

    #[test]
    fn to_pixel_rect_floors_each_coordinate() {
        let r = Region::manual(0.1, 0.2, 0.33, 0.5);
        let rect = r.to_pixel_rect(50, 10).unwrap();
        assert_eq!(rect, PixelRect::new(5, 2, 16, 5));
    }

    #[test]
    fn to_pixel_rect_absorbs_float_noise() {
        let r = Region::manual(0.29, 0.57, 0.07, 0.14);
        let rect = r.to_pixel_rect(100, 100).unwrap();
        assert_eq!(rect, PixelRect::new(29, 57, 7, 14));
    }

    #[test]
    fn to_pixel_rect_rejects_degenerate_regions() {
        let thin = Region::manual(0.5, 0.5, 0.01, 0.5);
        assert!(matches!(
            thin.to_pixel_rect(20, 20),
            Err(Error::OutOfBounds { width: 0, .. })
        ));

        let off_canvas = Region::manual(1.0, 0.0, 0.5, 0.5);
        assert!(off_canvas.to_pixel_rect(20, 20).is_err());
    }

    #[test]
    fn pixel_rect_normalization_maps_back() {
        let rect = PixelRect::new(24, 32, 16, 8);
        let region = Region::from_pixel_rect(rect, 64, 64, RegionKind::Auto);
        assert_eq!(region.to_pixel_rect(64, 64).unwrap(), rect);

        let rect = PixelRect::new(96, 0, 32, 7);
        let region = Region::from_pixel_rect(rect, 113, 7, RegionKind::Auto);
        assert_eq!(region.to_pixel_rect(113, 7).unwrap(), PixelRect::new(96, 0, 17, 7));
    }

    #[test]
    fn pixel_rects_survive_normalization_on_wide_images() {
        for (x, width) in [(20_640, 40_000), (32_512, 65_000), (99_968, 100_000)] {
            let rect = PixelRect::new(x, 0, 32, 32);
            let region = Region::from_pixel_rect(rect, width, 64, RegionKind::Auto);
            assert_eq!(region.to_pixel_rect(width, 64).unwrap(), rect, "x {x} of {width}");
        }
    }

    #[test]
    fn parse_accepts_four_values() {
        let r: Region = "0.1, 0.2,0.3,0.4".parse().unwrap();
        assert!((r.x() - 0.1).abs() < 1e-6);
        assert!((r.height() - 0.4).abs() < 1e-6);
        assert_eq!(r.kind(), RegionKind::Manual);

        let back: Region = r.to_string().parse().unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn parse_rejects_malformed_input() {
        for bad in ["", "0.1,0.2,0.3", "0.1,0.2,0.3,0.4,0.5", "a,b,c,d", "0.1,0.2,1.5,0.1"] {
            assert!(bad.parse::<Region>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn expand_is_clipped_to_image() {
        let rect = PixelRect::new(1, 8, 4, 2);
        assert_eq!(rect.expand(2, 10, 10), PixelRect::new(0, 6, 7, 4));
        assert!(rect.contains(4, 9));
        assert!(!rect.contains(5, 9));
        assert_eq!(rect.area(), 8);
    }

    #[test]
    fn union_covers_both() {
        let a = PixelRect::new(0, 0, 8, 8);
        let b = PixelRect::new(8, 4, 8, 8);
        assert_eq!(a.union(&b), PixelRect::new(0, 0, 16, 12));
    }
}
