//! Detection + removal pipeline over image files.

use std::fmt;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detection::{self, DetectionResult, DetectorConfig};
use crate::error::{Error, Result};
use crate::inpaint::{self, InpaintConfig, InpaintOutcome};
use crate::pixel::PixelBuffer;
use crate::progress::{ProgressReport, ProgressSink};
use crate::region::Region;

/// Options controlling how a file is processed.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// User-drawn regions, removed before any detected ones.
    pub regions: Vec<Region>,
    /// Run the detector and append its regions.
    pub detect: bool,
    /// Seed for the sampling RNG; `None` draws from the OS.
    pub seed: Option<u64>,
    /// Enable verbose logging.
    pub verbose: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            detect: true,
            seed: None,
            verbose: false,
            quiet: false,
        }
    }
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Whether the file was skipped (nothing to remove).
    pub skipped: bool,
    /// Regions reported by the detector.
    pub detected: usize,
    /// Regions inpainted.
    pub removed: usize,
    /// Human-readable status message.
    pub message: String,
}

impl ProcessResult {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            success: false,
            skipped: false,
            detected: 0,
            removed: 0,
            message: String::new(),
        }
    }
}

/// Totals over the results of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Files written with at least one region removed.
    pub cleaned: usize,
    /// Files with nothing to remove.
    pub skipped: usize,
    /// Files that could not be processed.
    pub failed: usize,
    /// Regions found by the detector across all files.
    pub detected: usize,
    /// Regions inpainted across all files.
    pub removed: usize,
}

impl BatchSummary {
    /// Tally `results`.
    #[must_use]
    pub fn from_results(results: &[ProcessResult]) -> Self {
        results.iter().fold(Self::default(), |mut acc, r| {
            if r.skipped {
                acc.skipped += 1;
            } else if r.success {
                acc.cleaned += 1;
            } else {
                acc.failed += 1;
            }
            acc.detected += r.detected;
            acc.removed += r.removed;
            acc
        })
    }

    /// Number of files seen.
    #[must_use]
    pub fn files(&self) -> usize {
        self.cleaned + self.skipped + self.failed
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cleaned: {}", self.cleaned)?;
        if self.skipped > 0 {
            write!(f, ", Skipped: {}", self.skipped)?;
        }
        if self.failed > 0 {
            write!(f, ", Failed: {}", self.failed)?;
        }
        write!(
            f,
            " (Total: {}); regions detected: {}, removed: {}",
            self.files(),
            self.detected,
            self.removed
        )
    }
}

/// Region detector and inpainter with their settings.
///
/// The engine holds configuration only; it can be shared across threads and
/// reused for any number of images.
#[derive(Debug, Clone, Default)]
pub struct RemovalEngine {
    detector: DetectorConfig,
    inpaint: InpaintConfig,
}

impl RemovalEngine {
    /// Create an engine with default thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with explicit settings.
    #[must_use]
    pub fn with_config(detector: DetectorConfig, inpaint: InpaintConfig) -> Self {
        Self { detector, inpaint }
    }

    /// Detector settings.
    #[must_use]
    pub fn detector_config(&self) -> &DetectorConfig {
        &self.detector
    }

    /// Inpainter settings.
    #[must_use]
    pub fn inpaint_config(&self) -> &InpaintConfig {
        &self.inpaint
    }

    /// Find candidate watermark regions without modifying the image.
    #[must_use]
    pub fn detect(&self, buffer: &PixelBuffer) -> DetectionResult {
        detection::detect_regions(buffer, &self.detector)
    }

    /// Inpaint `regions` in order, in place.
    ///
    /// # Errors
    ///
    /// See [`inpaint::inpaint_regions`].
    pub fn remove<R, P>(
        &self,
        buffer: &mut PixelBuffer,
        regions: &[Region],
        rng: &mut R,
        progress: &mut P,
    ) -> Result<Vec<InpaintOutcome>>
    where
        R: Rng + ?Sized,
        P: ProgressSink + ?Sized,
    {
        inpaint::inpaint_regions(buffer, regions, &self.inpaint, rng, progress)
    }

    /// Process a single image file: load, detect, remove, save.
    ///
    /// Manual regions that map to an empty rectangle on this image are
    /// skipped with a warning. Returns a [`ProcessResult`] indicating
    /// success, skip, or failure.
    #[must_use]
    pub fn process_file(
        &self,
        input: &Path,
        output: &Path,
        opts: &ProcessOptions,
    ) -> ProcessResult {
        let mut result = ProcessResult::new(input);

        let mut buffer = match PixelBuffer::open(input) {
            Ok(buffer) => buffer,
            Err(e) => {
                result.message = format!("Failed to load: {e}");
                return result;
            }
        };
        let (w, h) = buffer.dimensions();

        let mut regions: Vec<Region> = opts
            .regions
            .iter()
            .filter(|region| match region.to_pixel_rect(w, h) {
                Ok(_) => true,
                Err(e) => {
                    log::warn!("{}: skipping region {region}: {e}", input.display());
                    false
                }
            })
            .copied()
            .collect();

        if opts.detect {
            let detection = self.detect(&buffer);
            result.detected = detection.len();
            regions.extend(detection);
        }

        if regions.is_empty() {
            result.skipped = true;
            result.success = true;
            result.message = "No regions to remove".to_string();
            return result;
        }

        let mut rng = match opts.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut progress = |report: ProgressReport| {
            log::debug!(
                "{}: region {}/{} ({:.0}%)",
                input.display(),
                report.completed,
                report.total,
                report.percent()
            );
        };

        match self.remove(&mut buffer, &regions, &mut rng, &mut progress) {
            Ok(outcomes) => result.removed = outcomes.len(),
            Err(e) => {
                result.message = format!("Failed to inpaint: {e}");
                return result;
            }
        }

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    result.message = format!("Failed to create output directory: {e}");
                    return result;
                }
            }
        }

        match save_image(&buffer, output) {
            Ok(()) => {
                result.success = true;
                result.message = format!(
                    "Removed {} region{} ({} detected)",
                    result.removed,
                    if result.removed == 1 { "" } else { "s" },
                    result.detected
                );
                log::info!("{} -> {}: {}", input.display(), output.display(), result.message);
            }
            Err(e) => {
                result.message = format!("Failed to save: {e}");
            }
        }

        result
    }

    /// Process all supported images in a directory.
    ///
    /// Images run in parallel when the `parallel` feature is enabled (via
    /// rayon); each one still owns its buffer. With a fixed seed every image
    /// uses the same seed. Returns a [`ProcessResult`] for each image found.
    #[must_use]
    pub fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        opts: &ProcessOptions,
    ) -> Vec<ProcessResult> {
        let entries: Vec<_> = match std::fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .filter(|e| is_supported_image(e.path().as_path()))
                .collect(),
            Err(e) => {
                let mut failed = ProcessResult::new(input_dir);
                failed.message = format!("Failed to read directory: {e}");
                return vec![failed];
            }
        };

        if !output_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(output_dir) {
                let mut failed = ProcessResult::new(output_dir);
                failed.message = format!("Failed to create output directory: {e}");
                return vec![failed];
            }
        }

        let process = |entry: &std::fs::DirEntry| {
            let output_path = output_dir.join(entry.file_name());
            self.process_file(&entry.path(), &output_path, opts)
        };

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            entries.par_iter().map(process).collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            entries.iter().map(process).collect()
        }
    }
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Save a buffer in the format implied by the file extension.
///
/// PNG, WebP and BMP keep the alpha channel. JPEG has none, so the image is
/// flattened to RGB and written at quality 100.
///
/// # Errors
///
/// Returns an error if the format is unsupported or writing fails.
pub fn save_image(buffer: &PixelBuffer, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    match format {
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(buffer.as_image().clone()).to_rgb8();
            let file = std::fs::File::create(path)?;
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(file, 100);
            encoder.encode_image(&rgb)?;
        }
        ImageFormat::Png | ImageFormat::WebP | ImageFormat::Bmp => {
            buffer.as_image().save_with_format(path, format)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    Ok(())
}

/// Generate a default output path from an input path.
///
/// Example: `"photo.jpg"` becomes `"photo_cleaned.jpg"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let ext = input.extension().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_cleaned.{ext}"))
}
