//! Context-sampling inpainting.
//!
//! A region is rebuilt from the ring of pixels around it. Every output pixel
//! is the mean of a few random picks from that ring, and the filled block is
//! then smoothed with a small box blur to hide the sampling noise.
//!
//! Randomness is injected: pass a seeded [`rand::rngs::StdRng`] for
//! reproducible output.

use image::RgbaImage;
use rand::Rng;

use crate::error::{Error, Result};
use crate::pixel::{PixelBuffer, CHANNELS};
use crate::progress::{ProgressReport, ProgressSink};
use crate::region::{PixelRect, Region};

/// Opaque white, used when a region has no surrounding context.
pub const WHITE: [u8; 4] = [255, 255, 255, 255];

/// Tunable parameters for [`inpaint_region`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InpaintConfig {
    /// Upper bound on the thickness of the sampled context ring.
    pub max_sample_radius: u32,
    /// Random context samples averaged per output pixel.
    pub samples_per_pixel: u32,
    /// Box blur radius; the kernel is `2r + 1` pixels square.
    pub blur_radius: u32,
    /// Fill colour when the context ring is empty.
    pub fallback: [u8; 4],
}

impl Default for InpaintConfig {
    fn default() -> Self {
        Self {
            max_sample_radius: 20,
            samples_per_pixel: 5,
            blur_radius: 2,
            fallback: WHITE,
        }
    }
}

/// What happened to one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InpaintOutcome {
    /// Pixel rectangle that was overwritten.
    pub rect: PixelRect,
    /// Thickness of the context ring.
    pub sample_radius: u32,
    /// Number of context pixels collected, duplicates included.
    pub pool_size: usize,
    /// Whether the region was filled with the fallback colour.
    pub fallback: bool,
}

/// Context ring thickness for a rectangle: a quarter of its shorter side,
/// capped at `max`.
#[must_use]
pub fn sample_radius(rect: PixelRect, max: u32) -> u32 {
    (rect.width.min(rect.height) / 4).min(max)
}

/// Collect the pixels in a ring of thickness `radius` around `rect`.
///
/// The top and bottom strips span `radius` past the left and right edges,
/// the left and right strips span `radius` past the top and bottom, so
/// corner pixels appear twice. Pixels outside the buffer are skipped.
#[must_use]
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub fn context_pool(buffer: &PixelBuffer, rect: PixelRect, radius: u32) -> Vec<[u8; 4]> {
    if radius == 0 {
        return Vec::new();
    }

    let (width, height) = (i64::from(buffer.width()), i64::from(buffer.height()));
    let r = i64::from(radius);
    let (x0, y0) = (i64::from(rect.x), i64::from(rect.y));
    let (x1, y1) = (i64::from(rect.right()), i64::from(rect.bottom()));

    // (left, top, right, bottom), exclusive on the right and bottom.
    let strips = [
        (x0 - r, y0 - r, x1 + r, y0),
        (x0 - r, y1, x1 + r, y1 + r),
        (x0 - r, y0 - r, x0, y1 + r),
        (x1, y0 - r, x1 + r, y1 + r),
    ];

    let raw = buffer.as_raw();
    let mut pool = Vec::new();
    for (left, top, right, bottom) in strips {
        let (left, right) = (left.clamp(0, width), right.clamp(0, width));
        let (top, bottom) = (top.clamp(0, height), bottom.clamp(0, height));
        if left >= right || top >= bottom {
            continue;
        }
        for y in top as u32..bottom as u32 {
            let start = buffer.offset(left as u32, y);
            let end = buffer.offset(right as u32 - 1, y) + CHANNELS;
            pool.extend(
                raw[start..end]
                    .chunks_exact(CHANNELS)
                    .map(|px| [px[0], px[1], px[2], px[3]]),
            );
        }
    }
    pool
}

/// Reconstruct the pixels of `region` from its surroundings, in place.
///
/// Only pixels inside the region's rectangle are written. If the context
/// ring is empty (for example a region covering the whole image) the region
/// becomes [`InpaintConfig::fallback`], opaque white by default.
///
/// # Errors
///
/// Returns [`Error::OutOfBounds`] if the region maps to an empty rectangle.
pub fn inpaint_region<R: Rng + ?Sized>(
    buffer: &mut PixelBuffer,
    region: &Region,
    config: &InpaintConfig,
    rng: &mut R,
) -> Result<InpaintOutcome> {
    let rect = region.to_pixel_rect(buffer.width(), buffer.height())?;
    let radius = sample_radius(rect, config.max_sample_radius);
    let pool = context_pool(buffer, rect, radius);

    let outcome = InpaintOutcome {
        rect,
        sample_radius: radius,
        pool_size: pool.len(),
        fallback: pool.is_empty(),
    };

    if pool.is_empty() {
        log::warn!(
            "no context around {}x{} at ({}, {}), filling with {:?}",
            rect.width,
            rect.height,
            rect.x,
            rect.y,
            config.fallback
        );
        fill_solid(buffer, rect, config.fallback);
        return Ok(outcome);
    }

    fill_from_pool(buffer, rect, &pool, config.samples_per_pixel, rng);
    box_blur(buffer, rect, config.blur_radius);

    log::debug!(
        "inpainted {}x{} at ({}, {}) from {} context pixels (radius {radius})",
        rect.width,
        rect.height,
        rect.x,
        rect.y,
        pool.len()
    );
    Ok(outcome)
}

/// Inpaint `regions` one after another on the same buffer.
///
/// Later regions see the pixels written by earlier ones, so order matters.
/// `progress` receives one report per finished region and is polled for
/// cancellation before each region starts.
///
/// # Errors
///
/// Stops at the first region that fails with [`Error::OutOfBounds`], or with
/// [`Error::Cancelled`] once the sink reports cancellation. Regions already
/// processed stay applied.
pub fn inpaint_regions<R, P>(
    buffer: &mut PixelBuffer,
    regions: &[Region],
    config: &InpaintConfig,
    rng: &mut R,
    progress: &mut P,
) -> Result<Vec<InpaintOutcome>>
where
    R: Rng + ?Sized,
    P: ProgressSink + ?Sized,
{
    let total = regions.len();
    let mut outcomes = Vec::with_capacity(total);

    for (index, region) in regions.iter().enumerate() {
        if progress.is_cancelled() {
            return Err(Error::Cancelled {
                completed: index,
                total,
            });
        }
        outcomes.push(inpaint_region(buffer, region, config, rng)?);
        progress.report(ProgressReport::new(index + 1, total));
    }

    Ok(outcomes)
}

fn fill_solid(buffer: &mut PixelBuffer, rect: PixelRect, rgba: [u8; 4]) {
    for row in rect_rows_mut(buffer, rect) {
        for px in row.chunks_exact_mut(CHANNELS) {
            px.copy_from_slice(&rgba);
        }
    }
}

/// Set every pixel of `rect` to the mean of `samples` draws from `pool`.
///
/// The four channels of one draw come from the same context pixel.
fn fill_from_pool<R: Rng + ?Sized>(
    buffer: &mut PixelBuffer,
    rect: PixelRect,
    pool: &[[u8; 4]],
    samples: u32,
    rng: &mut R,
) {
    let samples = samples.max(1);
    for row in rect_rows_mut(buffer, rect) {
        for px in row.chunks_exact_mut(CHANNELS) {
            let mut sum = [0u32; CHANNELS];
            for _ in 0..samples {
                let pick = pool[rng.random_range(0..pool.len())];
                for (acc, v) in sum.iter_mut().zip(pick) {
                    *acc += u32::from(v);
                }
            }
            for (dst, acc) in px.iter_mut().zip(sum) {
                *dst = rounded_mean(acc, samples);
            }
        }
    }
}

/// Smooth `rect` with a `(2r+1)^2` box kernel.
///
/// Reads from a snapshot of `rect` grown by `radius` (clipped to the image)
/// so results never depend on already-blurred neighbours. Each output is the
/// mean of the neighbours that exist, so the divisor shrinks at image edges.
/// Only pixels inside `rect` are written.
fn box_blur(buffer: &mut PixelBuffer, rect: PixelRect, radius: u32) {
    if radius == 0 {
        return;
    }

    let window = rect.expand(radius, buffer.width(), buffer.height());
    let snapshot = image::imageops::crop_imm(
        buffer.as_image(),
        window.x,
        window.y,
        window.width,
        window.height,
    )
    .to_image();
    let origin = (rect.x - window.x, rect.y - window.y);

    let row_len = rect.width as usize * CHANNELS;
    let mut blurred = vec![0u8; row_len * rect.height as usize];

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        blurred
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(dy, out)| blur_row(&snapshot, origin, dy, radius, out));
    }

    #[cfg(not(feature = "parallel"))]
    {
        blurred
            .chunks_mut(row_len)
            .enumerate()
            .for_each(|(dy, out)| blur_row(&snapshot, origin, dy, radius, out));
    }

    for (row, src) in rect_rows_mut(buffer, rect).zip(blurred.chunks(row_len)) {
        row.copy_from_slice(src);
    }
}

/// Blur output row `dy` of the target rectangle whose top-left corner sits
/// at `origin` inside `snapshot`.
#[allow(clippy::cast_possible_truncation)]
fn blur_row(snapshot: &RgbaImage, origin: (u32, u32), dy: usize, radius: u32, out: &mut [u8]) {
    let (sw, sh) = snapshot.dimensions();
    let cy = origin.1 + dy as u32;
    let (top, bottom) = (cy.saturating_sub(radius), (cy + radius).min(sh - 1));

    for (dx, px) in out.chunks_exact_mut(CHANNELS).enumerate() {
        let cx = origin.0 + dx as u32;
        let (left, right) = (cx.saturating_sub(radius), (cx + radius).min(sw - 1));

        let mut sum = [0u32; CHANNELS];
        let mut count = 0u32;
        for y in top..=bottom {
            for x in left..=right {
                for (acc, v) in sum.iter_mut().zip(snapshot.get_pixel(x, y).0) {
                    *acc += u32::from(v);
                }
                count += 1;
            }
        }
        for (dst, acc) in px.iter_mut().zip(sum) {
            *dst = rounded_mean(acc, count);
        }
    }
}

fn rounded_mean(sum: u32, count: u32) -> u8 {
    u8::try_from((sum + count / 2) / count).unwrap_or(u8::MAX)
}

/// Mutable byte rows of `rect`, top to bottom.
fn rect_rows_mut(buffer: &mut PixelBuffer, rect: PixelRect) -> impl Iterator<Item = &mut [u8]> {
    let stride = buffer.stride();
    let start = rect.x as usize * CHANNELS;
    let len = rect.width as usize * CHANNELS;
    buffer
        .as_raw_mut()
        .chunks_exact_mut(stride)
        .skip(rect.y as usize)
        .take(rect.height as usize)
        .map(move |row| &mut row[start..start + len])
}
