//! Block-statistics watermark region detection.
//!
//! The image is scanned in square blocks. A block becomes a candidate region
//! when enough of its pixels are semi-transparent, or when enough of them are
//! near-white or near-black:
//! 1. **Transparency**: alpha below [`DetectorConfig::alpha_cutoff`]
//! 2. **Extremity**: mean of R, G, B above [`DetectorConfig::bright_cutoff`]
//!    or below [`DetectorConfig::dark_cutoff`]
//!
//! Flagged blocks are reported one region per block, in row-major order.

use std::collections::VecDeque;

use crate::pixel::{PixelBuffer, CHANNELS};
use crate::region::{PixelRect, Region, RegionKind};

/// Tunable thresholds for [`detect_regions`].
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Edge length of the square scan blocks in pixels.
    pub block_size: u32,
    /// Pixels with alpha strictly below this count as transparent.
    pub alpha_cutoff: u8,
    /// Pixels with mean RGB strictly above this count as extreme.
    pub bright_cutoff: u8,
    /// Pixels with mean RGB strictly below this count as extreme.
    pub dark_cutoff: u8,
    /// Fraction of transparent pixels a block must exceed.
    pub transparency_ratio: f32,
    /// Fraction of extreme pixels a block must exceed.
    pub extremity_ratio: f32,
    /// Join edge-adjacent flagged blocks into one bounding region.
    pub merge_adjacent: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            block_size: 32,
            alpha_cutoff: 200,
            bright_cutoff: 200,
            dark_cutoff: 50,
            transparency_ratio: 0.3,
            extremity_ratio: 0.5,
            merge_adjacent: false,
        }
    }
}

/// Regions flagged by one detector pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionResult {
    /// Candidate regions, all tagged [`RegionKind::Auto`].
    pub regions: Vec<Region>,
    /// Number of blocks examined.
    pub blocks_scanned: u32,
}

impl DetectionResult {
    /// Number of candidate regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether nothing was flagged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Iterate over the candidate regions in scan order.
    pub fn iter(&self) -> std::slice::Iter<'_, Region> {
        self.regions.iter()
    }

    /// Take the candidate regions.
    #[must_use]
    pub fn into_regions(self) -> Vec<Region> {
        self.regions
    }
}

impl IntoIterator for DetectionResult {
    type Item = Region;
    type IntoIter = std::vec::IntoIter<Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.into_iter()
    }
}

/// Pixel counts gathered over one block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockStats {
    /// Pixels in the block.
    pub total: u32,
    /// Pixels below the alpha cutoff.
    pub transparent: u32,
    /// Pixels above the bright cutoff or below the dark cutoff.
    pub extreme: u32,
}

impl BlockStats {
    /// Count transparent and extreme pixels inside `rect`.
    ///
    /// `rect` must lie within the buffer.
    #[must_use]
    pub fn measure(buffer: &PixelBuffer, rect: PixelRect, config: &DetectorConfig) -> Self {
        let raw = buffer.as_raw();
        // Compare channel sums against 3x the cutoffs: exact for a float mean.
        let bright = 3 * u16::from(config.bright_cutoff);
        let dark = 3 * u16::from(config.dark_cutoff);

        let mut stats = Self::default();
        for y in rect.y..rect.bottom() {
            let start = buffer.offset(rect.x, y);
            let row = &raw[start..start + rect.width as usize * CHANNELS];
            for px in row.chunks_exact(CHANNELS) {
                stats.total += 1;
                if px[3] < config.alpha_cutoff {
                    stats.transparent += 1;
                }
                let sum = u16::from(px[0]) + u16::from(px[1]) + u16::from(px[2]);
                if sum > bright || sum < dark {
                    stats.extreme += 1;
                }
            }
        }
        stats
    }

    /// Whether the block should be reported as a candidate region.
    #[must_use]
    pub fn is_candidate(&self, config: &DetectorConfig) -> bool {
        exceeds(self.transparent, self.total, config.transparency_ratio)
            || exceeds(self.extreme, self.total, config.extremity_ratio)
    }
}

/// Whether `count` of `total` pixels exceeds `ratio`, in whole pixels.
///
/// A fractional limit is met by its integer part (307 of 1024 exceeds 0.3),
/// an integral one must be passed (30 of 100 does not exceed 0.3).
///
/// The limit is formed in `f64`. A limit within `f32` precision of a whole
/// number counts as whole, so `0.3 * 100` is 30 and not 30.000001.
fn exceeds(count: u32, total: u32, ratio: f32) -> bool {
    let limit = f64::from(ratio) * f64::from(total);
    let nearest = limit.round();
    let slack = f64::from(total) * f64::from(f32::EPSILON);
    let needed = if (limit - nearest).abs() <= slack {
        nearest + 1.0
    } else {
        limit.floor().max(1.0)
    };
    f64::from(count) >= needed
}

#[derive(Debug, Clone, Copy)]
struct FlaggedBlock {
    col: u32,
    row: u32,
    rect: PixelRect,
}

/// Scan `buffer` block by block and return candidate watermark regions.
///
/// The scan is deterministic and does not modify the buffer. Blocks on the
/// right and bottom edges are clipped to the image, so an image smaller than
/// one block is examined as a single block.
///
/// Adjacent flagged blocks stay separate regions unless
/// [`DetectorConfig::merge_adjacent`] is set.
#[must_use]
pub fn detect_regions(buffer: &PixelBuffer, config: &DetectorConfig) -> DetectionResult {
    let (width, height) = buffer.dimensions();
    let block = config.block_size.max(1);
    let cols = width.div_ceil(block);
    let rows = height.div_ceil(block);

    let mut flagged = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            let (x, y) = (col * block, row * block);
            let rect = PixelRect::new(x, y, block.min(width - x), block.min(height - y));
            let stats = BlockStats::measure(buffer, rect, config);
            if stats.is_candidate(config) {
                flagged.push(FlaggedBlock { col, row, rect });
            }
        }
    }

    log::debug!(
        "scanned {} blocks of {block}px on {width}x{height}, flagged {}",
        rows * cols,
        flagged.len()
    );

    let rects = if config.merge_adjacent {
        merge_adjacent_blocks(&flagged, cols, rows)
    } else {
        flagged.iter().map(|b| b.rect).collect()
    };

    DetectionResult {
        regions: rects
            .into_iter()
            .map(|rect| Region::from_pixel_rect(rect, width, height, RegionKind::Auto))
            .collect(),
        blocks_scanned: rows * cols,
    }
}

/// Group 4-connected flagged blocks and return each group's bounding box,
/// ordered by the group's first block in scan order.
fn merge_adjacent_blocks(flagged: &[FlaggedBlock], cols: u32, rows: u32) -> Vec<PixelRect> {
    let cell = |col: u32, row: u32| (row * cols + col) as usize;

    let mut grid: Vec<Option<usize>> = vec![None; (cols * rows) as usize];
    for (i, block) in flagged.iter().enumerate() {
        grid[cell(block.col, block.row)] = Some(i);
    }

    let mut visited = vec![false; flagged.len()];
    let mut merged = Vec::new();
    let mut queue = VecDeque::new();

    for start in 0..flagged.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        queue.push_back(start);
        let mut bounds = flagged[start].rect;

        while let Some(i) = queue.pop_front() {
            let FlaggedBlock { col, row, rect } = flagged[i];
            bounds = bounds.union(&rect);

            let neighbours = [
                (col > 0).then(|| cell(col - 1, row)),
                (col + 1 < cols).then(|| cell(col + 1, row)),
                (row > 0).then(|| cell(col, row - 1)),
                (row + 1 < rows).then(|| cell(col, row + 1)),
            ];
            for j in neighbours.into_iter().flatten().filter_map(|c| grid[c]) {
                if !visited[j] {
                    visited[j] = true;
                    queue.push_back(j);
                }
            }
        }
        merged.push(bounds);
    }

    merged
}
