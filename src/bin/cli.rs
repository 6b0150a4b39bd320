//! CLI application for LBP texture histograms.
//!
//! Usage:
//!   lbp-texture <image>                          # Human-readable output
//!   lbp-texture <image> --json                   # JSON output
//!   lbp-texture <image> -p 16 -r 2 --uniform     # Uniform LBP(16, 2)
//!   lbp-texture <image> --config lbp.bin         # Saved configuration

use clap::Parser;
use lbp_texture::{LbpConfig, LbpOperator, LbpOptions, Tensor, TableKind};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lbp-texture")]
#[command(author, version, about = "Local Binary Pattern texture histograms", long_about = None)]
struct Args {
    /// Input image file
    #[arg(required = true)]
    image: PathBuf,

    /// Number of ring samples (P)
    #[arg(short, long, default_value = "8")]
    points: u32,

    /// Ring radius in pixels (R)
    #[arg(short, long, default_value = "1")]
    radius: u32,

    /// Compare against the ring average instead of the center
    #[arg(long)]
    to_average: bool,

    /// Append the center-vs-average bit (needs --to-average)
    #[arg(long)]
    add_avg_bit: bool,

    /// Collapse non-uniform patterns
    #[arg(long)]
    uniform: bool,

    /// Rotation invariant patterns
    #[arg(long)]
    rotation_invariant: bool,

    /// Load P, R and options from a saved config (overrides the flags above)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save the effective config to this file
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Divide bin counts by the number of coded pixels
    #[arg(long)]
    normalize: bool,

    /// Output as JSON
    #[arg(short, long)]
    json: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Output structure for JSON serialization
#[derive(Serialize)]
struct Output {
    image: String,
    width: u32,
    height: u32,
    config: LbpConfig,
    table: TableKind,
    /// Pixels with a full R margin
    coded_pixels: u32,
    bins: usize,
    histogram: Histogram,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Histogram {
    Counts(Vec<u32>),
    Normalized(Vec<f32>),
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => {
            if args.verbose {
                eprintln!("Loading config from {:?}...", path);
            }
            LbpConfig::load(path)?
        }
        None => LbpConfig {
            points: args.points,
            radius: args.radius,
            options: LbpOptions {
                to_average: args.to_average,
                add_avg_bit: args.add_avg_bit,
                uniform: args.uniform,
                rotation_invariant: args.rotation_invariant,
            },
        },
    };

    let op = LbpOperator::from_config(&config)?;
    if args.verbose {
        eprintln!(
            "LBP({}, {}) with {:?} table, {} bins",
            op.points(),
            op.radius(),
            op.active_table(),
            op.symbol_count()
        );
    }

    if let Some(ref path) = args.save_config {
        config.save(path)?;
        if args.verbose {
            eprintln!("Config written to {:?}", path);
        }
    }

    // Load image
    if args.verbose {
        eprintln!("Loading image {:?}...", args.image);
    }
    let img = image::open(&args.image)?;
    let gray = img.to_luma8();
    let (width, height) = gray.dimensions();
    let tensor = Tensor::from_vec(&[height as usize, width as usize], gray.into_raw())?;

    if args.verbose {
        eprintln!("Computing codes...");
    }
    let counts = op.histogram(&tensor.as_view())?;
    let coded_pixels: u32 = counts.iter().sum();

    let histogram = if args.normalize && coded_pixels > 0 {
        Histogram::Normalized(
            counts
                .iter()
                .map(|&c| c as f32 / coded_pixels as f32)
                .collect(),
        )
    } else {
        Histogram::Counts(counts)
    };

    let output = Output {
        image: args.image.display().to_string(),
        width,
        height,
        config,
        table: op.active_table(),
        coded_pixels,
        bins: op.symbol_count(),
        histogram,
    };

    // Generate output
    let output_str = if args.json {
        serde_json::to_string_pretty(&output)?
    } else {
        format_human_readable(&output)
    };

    // Write output
    if let Some(ref path) = args.output {
        std::fs::write(path, &output_str)?;
        if args.verbose {
            eprintln!("Output written to {:?}", path);
        }
    } else {
        println!("{}", output_str);
    }

    Ok(())
}

fn format_human_readable(output: &Output) -> String {
    let mut s = String::new();

    s.push_str(&format!("Image: {} ({}x{})\n", output.image, output.width, output.height));
    s.push_str(&format!(
        "Operator: LBP(P={}, R={}), table {:?}\n",
        output.config.points, output.config.radius, output.table
    ));
    s.push_str(&format!("Coded pixels: {}\n", output.coded_pixels));

    if output.coded_pixels == 0 {
        s.push_str("\nImage is smaller than the sampling ring.\n");
        return s;
    }

    s.push_str(&format!("\nHistogram ({} bins, non-empty only):\n", output.bins));
    match &output.histogram {
        Histogram::Counts(counts) => {
            for (bin, &count) in counts.iter().enumerate().filter(|(_, &c)| c > 0) {
                s.push_str(&format!("  {:>6}: {}\n", bin, count));
            }
        }
        Histogram::Normalized(freqs) => {
            for (bin, &freq) in freqs.iter().enumerate().filter(|(_, &f)| f > 0.0) {
                s.push_str(&format!("  {:>6}: {:.4}\n", bin, freq));
            }
        }
    }

    s
}
