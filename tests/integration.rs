use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use watermark_inpaint::inpaint::{inpaint_region, inpaint_regions};
use watermark_inpaint::{
    save_image, Cancellable, DetectorConfig, Error, InpaintConfig, NoProgress, PixelBuffer,
    PixelRect, ProcessOptions, ProgressReport, Region, RegionKind, RemovalEngine,
};

const GRAY: [u8; 4] = [128, 128, 128, 255];

fn paint(buffer: &mut PixelBuffer, rect: PixelRect, rgba: [u8; 4]) {
    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            buffer.set_pixel(x, y, rgba);
        }
    }
}

fn noise(width: u32, height: u32, seed: u64) -> PixelBuffer {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..width * height * 4).map(|_| rng.random::<u8>()).collect();
    PixelBuffer::from_raw(width, height, data).unwrap()
}

fn pixel_region(rect: PixelRect, buffer: &PixelBuffer) -> Region {
    Region::from_pixel_rect(rect, buffer.width(), buffer.height(), RegionKind::Manual)
}

/// 64x64 mid-gray with a fully transparent 16x16 square at (24, 24).
fn transparent_square_image() -> PixelBuffer {
    let mut buffer = PixelBuffer::filled(64, 64, GRAY).unwrap();
    paint(&mut buffer, PixelRect::new(24, 24, 16, 16), [0, 0, 0, 0]);
    buffer
}

fn fine_merging_detector() -> DetectorConfig {
    DetectorConfig {
        block_size: 8,
        merge_adjacent: true,
        ..DetectorConfig::default()
    }
}

#[test]
fn detection_is_deterministic_and_pure() {
    let mut buffer = noise(100, 80, 1);
    paint(&mut buffer, PixelRect::new(10, 10, 40, 30), [255, 255, 255, 90]);
    paint(&mut buffer, PixelRect::new(64, 32, 32, 32), [0, 0, 0, 255]);
    let before = buffer.clone();

    let engine = RemovalEngine::new();
    let first = engine.detect(&buffer);
    let second = engine.detect(&buffer);

    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert_eq!(buffer, before);
}

#[test]
fn transparency_threshold_boundary() {
    for (transparent, flagged) in [(307u32, true), (306, false)] {
        let mut buffer = PixelBuffer::filled(32, 32, GRAY).unwrap();
        for i in 0..transparent {
            buffer.set_pixel(i % 32, i / 32, [128, 128, 128, 150]);
        }
        let result = RemovalEngine::new().detect(&buffer);
        assert_eq!(
            result.len(),
            usize::from(flagged),
            "{transparent} transparent pixels should flag: {flagged}"
        );
    }
}

#[test]
fn small_image_threshold_must_be_passed() {
    for (transparent, flagged) in [(30u32, false), (31, true)] {
        let mut buffer = PixelBuffer::filled(10, 10, GRAY).unwrap();
        for i in 0..transparent {
            buffer.set_pixel(i % 10, i / 10, [128, 128, 128, 150]);
        }
        let result = RemovalEngine::new().detect(&buffer);
        assert_eq!(
            result.len(),
            usize::from(flagged),
            "{transparent}/100 transparent should flag: {flagged}"
        );
    }
}

#[test]
fn end_to_end_transparent_square_is_restored() {
    let mut buffer = transparent_square_image();
    let before = buffer.clone();
    let engine = RemovalEngine::with_config(fine_merging_detector(), InpaintConfig::default());

    let detection = engine.detect(&buffer);
    let rects: Vec<PixelRect> = detection
        .iter()
        .map(|r| r.to_pixel_rect(64, 64).unwrap())
        .collect();
    assert_eq!(rects, vec![PixelRect::new(24, 24, 16, 16)]);

    let mut rng = StdRng::seed_from_u64(2024);
    engine
        .remove(&mut buffer, &detection.into_regions(), &mut rng, &mut NoProgress)
        .unwrap();

    let square = PixelRect::new(24, 24, 16, 16);
    for y in 0..64 {
        for x in 0..64 {
            let px = buffer.pixel(x, y);
            if square.contains(x, y) {
                assert_eq!(px[3], 255, "alpha at ({x},{y})");
                for (c, v) in px.iter().take(3).enumerate() {
                    assert!(v.abs_diff(128) <= 2, "({x},{y}) ch {c} = {v}");
                }
            } else {
                assert_eq!(px, before.pixel(x, y), "({x},{y}) outside changed");
            }
        }
    }
}

#[test]
fn default_blocks_dilute_a_small_square() {
    // Each 32px block sees only 64 of its 1024 pixels transparent.
    let result = RemovalEngine::new().detect(&transparent_square_image());
    assert!(result.is_empty());
}

#[test]
fn inpaint_leaves_outside_pixels_untouched() {
    let mut buffer = noise(50, 40, 8);
    let before = buffer.clone();
    let region = Region::manual(0.3, 0.1, 0.45, 0.6);
    let outcome = inpaint_region(
        &mut buffer,
        &region,
        &InpaintConfig::default(),
        &mut StdRng::seed_from_u64(5),
    )
    .unwrap();

    assert_eq!(outcome.rect, PixelRect::new(15, 4, 22, 24));
    let mut changed_inside = 0;
    for y in 0..40 {
        for x in 0..50 {
            if outcome.rect.contains(x, y) {
                changed_inside += usize::from(buffer.pixel(x, y) != before.pixel(x, y));
            } else {
                assert_eq!(buffer.pixel(x, y), before.pixel(x, y), "({x},{y})");
            }
        }
    }
    assert!(changed_inside > 0);
}

#[test]
fn region_without_context_becomes_white() {
    let mut buffer = PixelBuffer::filled(1, 1, [12, 34, 56, 78]).unwrap();
    let outcome = inpaint_region(
        &mut buffer,
        &Region::manual(0.0, 0.0, 1.0, 1.0),
        &InpaintConfig::default(),
        &mut StdRng::seed_from_u64(0),
    )
    .unwrap();

    assert!(outcome.fallback);
    assert_eq!(buffer.pixel(0, 0), [255, 255, 255, 255]);
}

#[test]
fn processing_order_changes_the_result() {
    // A red block with a blue block directly to its right, on green.
    let mut base = PixelBuffer::filled(64, 64, [0, 255, 0, 255]).unwrap();
    let a = PixelRect::new(8, 8, 16, 16);
    let b = PixelRect::new(24, 8, 16, 16);
    paint(&mut base, a, [255, 0, 0, 255]);
    paint(&mut base, b, [0, 0, 255, 255]);
    let (region_a, region_b) = (pixel_region(a, &base), pixel_region(b, &base));

    let red_in_b = |buffer: &PixelBuffer| -> u64 {
        let mut sum = 0;
        for y in b.y..b.bottom() {
            for x in b.x..b.right() {
                sum += u64::from(buffer.pixel(x, y)[0]);
            }
        }
        sum
    };

    let config = InpaintConfig::default();

    let mut a_then_b = base.clone();
    inpaint_regions(
        &mut a_then_b,
        &[region_a, region_b],
        &config,
        &mut StdRng::seed_from_u64(9),
        &mut NoProgress,
    )
    .unwrap();

    let mut b_then_a = base.clone();
    inpaint_regions(
        &mut b_then_a,
        &[region_b, region_a],
        &config,
        &mut StdRng::seed_from_u64(9),
        &mut NoProgress,
    )
    .unwrap();

    // Inpainted first, A no longer holds red when B samples its border.
    assert_eq!(red_in_b(&a_then_b), 0);
    assert!(red_in_b(&b_then_a) > 0);
    assert_ne!(a_then_b, b_then_a);
}

#[test]
fn progress_is_strictly_increasing_and_ends_at_100() {
    let mut buffer = noise(64, 64, 4);
    let regions = [
        Region::manual(0.0, 0.0, 0.25, 0.25),
        Region::manual(0.5, 0.0, 0.25, 0.25),
        Region::manual(0.0, 0.5, 0.25, 0.25),
        Region::manual(0.5, 0.5, 0.25, 0.25),
    ];

    let mut percents = Vec::new();
    let mut sink = |r: ProgressReport| percents.push(r.percent());
    RemovalEngine::new()
        .remove(&mut buffer, &regions, &mut StdRng::seed_from_u64(1), &mut sink)
        .unwrap();

    assert_eq!(percents.len(), regions.len());
    assert!(percents.windows(2).all(|w| w[0] < w[1]), "{percents:?}");
    assert!((percents[percents.len() - 1] - 100.0).abs() < f32::EPSILON);
}

#[test]
fn cancellation_is_honoured_between_regions() {
    let mut buffer = noise(64, 64, 6);
    let before = buffer.clone();
    let regions = [
        Region::manual(0.0, 0.0, 0.25, 0.25),
        Region::manual(0.5, 0.0, 0.25, 0.25),
        Region::manual(0.0, 0.5, 0.25, 0.25),
        Region::manual(0.5, 0.5, 0.25, 0.25),
    ];

    let cancel = AtomicBool::new(false);
    let stop_after_two = |r: ProgressReport| {
        if r.completed == 2 {
            cancel.store(true, Ordering::Relaxed);
        }
    };
    let mut sink = Cancellable::new(stop_after_two, &cancel);

    let err = RemovalEngine::new()
        .remove(&mut buffer, &regions, &mut StdRng::seed_from_u64(1), &mut sink)
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled { completed: 2, total: 4 }), "{err}");

    // The last two regions were never touched.
    for y in 32..48 {
        for x in 0..16 {
            assert_eq!(buffer.pixel(x, y), before.pixel(x, y));
        }
    }
}

#[test]
fn undecodable_input_is_a_decode_error() {
    let err = PixelBuffer::decode(&[0x89, b'P', b'N', b'G', 0, 1, 2]).unwrap_err();
    assert!(matches!(err, Error::Decode(_)), "{err}");
}

#[test]
fn manual_regions_work_without_detection() {
    let mut buffer = transparent_square_image();
    let region = pixel_region(PixelRect::new(24, 24, 16, 16), &buffer);
    RemovalEngine::new()
        .remove(&mut buffer, &[region], &mut StdRng::seed_from_u64(3), &mut NoProgress)
        .unwrap();
    assert!((24..40).all(|i| buffer.pixel(i, i)[3] == 255));
}

#[test]
fn process_file_restores_transparent_square() {
    let dir = std::env::temp_dir().join(format!("watermark-inpaint-it-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let input = dir.join("square.png");
    let output = dir.join("nested").join("square_cleaned.png");
    save_image(&transparent_square_image(), &input).unwrap();

    let engine = RemovalEngine::with_config(fine_merging_detector(), InpaintConfig::default());
    let opts = ProcessOptions {
        seed: Some(11),
        ..ProcessOptions::default()
    };
    let result = engine.process_file(&input, &output, &opts);
    assert!(result.success, "{}", result.message);
    assert!(!result.skipped);
    assert_eq!(result.detected, 1);
    assert_eq!(result.removed, 1);

    let cleaned = PixelBuffer::open(&output).unwrap();
    assert_eq!(cleaned.dimensions(), (64, 64));
    assert!(cleaned.as_raw().chunks_exact(4).all(|px| px[3] == 255));

    let _ = std::fs::remove_dir_all(&dir);
}
