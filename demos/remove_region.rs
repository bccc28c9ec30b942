//! Remove a region (or auto-detected regions) from a single image.
//!
//! Usage:
//! ```sh
//! cargo run --example remove_region -- input.png output.png [x,y,w,h ...]
//! ```

use std::env;
use std::process;

use watermark_inpaint::{ProcessOptions, Region, RemovalEngine};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <input> <output> [x,y,w,h ...]", args[0]);
        process::exit(1);
    }

    let input = &args[1];
    let output = &args[2];
    let regions: Vec<Region> = args[3..]
        .iter()
        .map(|s| s.parse().expect("region must be x,y,w,h in [0, 1]"))
        .collect();

    let opts = ProcessOptions {
        detect: regions.is_empty(),
        regions,
        ..ProcessOptions::default()
    };
    let engine = RemovalEngine::new();
    let result = engine.process_file(input.as_ref(), output.as_ref(), &opts);

    if result.skipped {
        println!("Skipped: {}", result.message);
    } else if result.success {
        println!("Done: {}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        process::exit(1);
    }
}
