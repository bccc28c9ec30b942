use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use watermark_inpaint::{
    default_output_path, BatchSummary, DetectorConfig, InpaintConfig, PixelBuffer, ProcessOptions,
    ProcessResult, Region, RemovalEngine,
};

#[derive(Parser)]
#[command(
    name = "watermark-inpaint",
    about = "Detect watermark/logo regions and remove them by context-aware inpainting",
    version,
    after_help = "Simple usage: watermark-inpaint <image>  (auto-detect and remove)\n\n\
                  Regions are normalized to the image size: --region 0.8,0.9,0.15,0.08\n\
                  covers 15% x 8% of the image starting at 80% across, 90% down."
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Input image file or directory
    input: String,

    /// Output file or directory (default: {name}_cleaned.{ext})
    #[arg(short, long)]
    output: Option<String>,

    /// Region to remove as normalized x,y,width,height (repeatable)
    #[arg(short, long = "region", value_name = "X,Y,W,H")]
    regions: Vec<Region>,

    /// Also run auto-detection when regions are given
    #[arg(long, conflicts_with = "no_detect")]
    detect: bool,

    /// Never run auto-detection
    #[arg(long)]
    no_detect: bool,

    /// Print detected regions and exit without modifying anything
    #[arg(long)]
    list: bool,

    /// Detection block edge length in pixels
    #[arg(long, default_value_t = 32)]
    block_size: u32,

    /// Fraction of semi-transparent pixels that flags a block (0.0-1.0)
    #[arg(long, default_value_t = 0.3)]
    transparency_ratio: f32,

    /// Fraction of near-white/near-black pixels that flags a block (0.0-1.0)
    #[arg(long, default_value_t = 0.5)]
    extremity_ratio: f32,

    /// Merge edge-adjacent detected blocks into one region
    #[arg(long)]
    merge: bool,

    /// Seed for the sampling RNG (reproducible output)
    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if cli.block_size == 0 {
        eprintln!("Error: Block size must be at least 1");
        process::exit(1);
    }

    for (name, ratio) in [
        ("Transparency ratio", cli.transparency_ratio),
        ("Extremity ratio", cli.extremity_ratio),
    ] {
        if !(0.0..=1.0).contains(&ratio) {
            eprintln!("Error: {name} must be between 0.0 and 1.0");
            process::exit(1);
        }
    }

    let detector = DetectorConfig {
        block_size: cli.block_size,
        transparency_ratio: cli.transparency_ratio,
        extremity_ratio: cli.extremity_ratio,
        merge_adjacent: cli.merge,
        ..DetectorConfig::default()
    };
    let engine = RemovalEngine::with_config(detector, InpaintConfig::default());

    let input_path = Path::new(&cli.input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input);
        process::exit(1);
    }

    if cli.list {
        list_regions(&engine, input_path);
        return;
    }

    let opts = ProcessOptions {
        detect: !cli.no_detect && (cli.detect || cli.regions.is_empty()),
        regions: cli.regions,
        seed: cli.seed,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    if !opts.quiet {
        if opts.detect {
            eprintln!(
                "Auto-detection enabled ({}px blocks, transparency {:.0}%, extremity {:.0}%)",
                engine.detector_config().block_size,
                engine.detector_config().transparency_ratio * 100.0,
                engine.detector_config().extremity_ratio * 100.0,
            );
        }
        if !opts.regions.is_empty() {
            eprintln!("Manual regions: {}", opts.regions.len());
        }
        eprintln!();
    }

    let results = if input_path.is_dir() {
        let output_dir = if let Some(o) = &cli.output {
            PathBuf::from(o)
        } else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: watermark-inpaint <input_dir> -o <output_dir>");
            process::exit(1);
        };
        engine.process_directory(input_path, &output_dir, &opts)
    } else {
        let output_path = match &cli.output {
            Some(o) => PathBuf::from(o),
            None => default_output_path(input_path),
        };
        vec![engine.process_file(input_path, &output_path, &opts)]
    };

    for r in &results {
        print_result(r, &opts);
    }

    let summary = BatchSummary::from_results(&results);
    if results.len() > 1 && !opts.quiet {
        eprintln!();
        eprintln!("[Summary] {summary}");
    }

    if summary.failed > 0 {
        process::exit(1);
    }
}

fn list_regions(engine: &RemovalEngine, input: &Path) {
    if input.is_dir() {
        eprintln!("Error: --list expects a single image file");
        process::exit(1);
    }

    let buffer = match PixelBuffer::open(input) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error: Failed to load {}: {e}", input.display());
            process::exit(1);
        }
    };
    let (w, h) = buffer.dimensions();

    let detection = engine.detect(&buffer);
    eprintln!(
        "{}: {} region(s) in {} blocks",
        input.display(),
        detection.len(),
        detection.blocks_scanned
    );
    for region in detection.iter() {
        match region.to_pixel_rect(w, h) {
            Ok(rect) => println!(
                "{region}\t{}x{}+{}+{}",
                rect.width, rect.height, rect.x, rect.y
            ),
            Err(_) => println!("{region}"),
        }
    }
}

fn print_result(result: &ProcessResult, opts: &ProcessOptions) {
    if opts.quiet && result.success {
        return;
    }

    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.skipped {
        if !opts.quiet {
            eprintln!("[SKIP] {filename}: {}", result.message);
        }
    } else if result.success {
        if !opts.quiet {
            eprintln!(
                "[OK] {filename}: {} removed ({} detected, {} manual)",
                result.removed,
                result.detected,
                result.removed.saturating_sub(result.detected)
            );
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }

    if opts.verbose && !result.message.is_empty() {
        eprintln!("  -> {}", result.message);
    }
}
