//! Detect watermark/logo regions and remove them by context-aware inpainting.
//!
//! Two pieces work over one in-memory RGBA [`PixelBuffer`]:
//!
//! - the **detector** scans the image in square blocks and flags blocks with
//!   many semi-transparent or near-white/near-black pixels, returning
//!   normalized [`Region`]s;
//! - the **inpainter** rebuilds a region by averaging random samples from the
//!   ring of pixels around it, then smooths the result with a box blur.
//!
//! # Quick Start
//!
//! ```no_run
//! use rand::SeedableRng;
//! use watermark_inpaint::{NoProgress, PixelBuffer, RemovalEngine};
//!
//! let engine = RemovalEngine::new();
//! let mut buffer = PixelBuffer::open("photo.png".as_ref()).unwrap();
//! let regions = engine.detect(&buffer).into_regions();
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! engine.remove(&mut buffer, &regions, &mut rng, &mut NoProgress).unwrap();
//! std::fs::write("cleaned.png", buffer.encode_png().unwrap()).unwrap();
//! ```
//!
//! # Manual regions and progress
//!
//! Regions are normalized to the image size, so the same region applies to
//! any resolution. Regions are processed strictly in order; each one sees the
//! pixels written by the previous ones.
//!
//! ```no_run
//! use watermark_inpaint::{PixelBuffer, ProgressReport, Region, RemovalEngine};
//!
//! let engine = RemovalEngine::new();
//! let mut buffer = PixelBuffer::open("photo.png".as_ref()).unwrap();
//! let regions = [Region::manual(0.8, 0.85, 0.15, 0.1)];
//!
//! let mut rng = rand::rng();
//! let mut on_progress = |p: ProgressReport| println!("{:.0}%", p.percent());
//! engine.remove(&mut buffer, &regions, &mut rng, &mut on_progress).unwrap();
//! ```

#![deny(missing_docs)]

pub mod detection;
mod engine;
pub mod error;
pub mod inpaint;
pub mod pixel;
pub mod progress;
pub mod region;

pub use detection::{DetectionResult, DetectorConfig};
pub use engine::{
    default_output_path, is_supported_image, save_image, BatchSummary, ProcessOptions,
    ProcessResult, RemovalEngine,
};
pub use error::{Error, Result};
pub use inpaint::{InpaintConfig, InpaintOutcome};
pub use pixel::PixelBuffer;
pub use progress::{Cancellable, NoProgress, ProgressReport, ProgressSink};
pub use region::{PixelRect, Region, RegionKind};
