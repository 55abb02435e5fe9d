use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use siim_rs::{mask, split, FoldSplit, LabelTable};

#[derive(Parser)]
#[command(name = "siim-rle")]
#[command(
    about = "RLE mask tools for the SIIM pneumothorax label format — decode masks, audit label tables, and write stratified splits"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a single RLE string and print a summary
    Decode {
        /// RLE label string ("-1" for the no-mask sentinel)
        rle: String,

        /// Mask height in pixels
        #[arg(long, default_value_t = 1024)]
        height: u32,

        /// Mask width in pixels
        #[arg(long, default_value_t = 1024)]
        width: u32,

        /// Print the decoded grid (only sensible for small masks)
        #[arg(long)]
        grid: bool,
    },

    /// Print record and class counts for a label CSV
    Stats {
        /// Path to the label CSV (ImageId, EncodedPixels)
        labels: PathBuf,
    },

    /// Round-trip every label through the codec and report problems
    Validate {
        /// Path to the label CSV (ImageId, EncodedPixels)
        labels: PathBuf,

        /// Mask height in pixels
        #[arg(long, default_value_t = 1024)]
        height: u32,

        /// Mask width in pixels
        #[arg(long, default_value_t = 1024)]
        width: u32,
    },

    /// Write a stratified split manifest as JSON (k-fold or holdout)
    Split {
        /// Path to the label CSV (ImageId, EncodedPixels)
        labels: PathBuf,

        /// Output manifest path
        #[arg(long)]
        out: PathBuf,

        /// Number of folds for a k-fold split
        #[arg(long, conflicts_with = "eval_fraction")]
        folds: Option<usize>,

        /// Eval fraction for a single train/eval holdout split
        #[arg(long)]
        eval_fraction: Option<f64>,

        /// RNG seed for the stratified shuffle
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Upsample the minority class before splitting
        #[arg(long)]
        balance: bool,
    },
}

/// K-fold manifest: fold index sets point into `image_ids`.
#[derive(Serialize)]
struct KfoldManifest {
    seed: u64,
    image_ids: Vec<String>,
    folds: Vec<FoldSplit>,
}

/// Holdout manifest: train/eval index sets point into `image_ids`.
#[derive(Serialize)]
struct HoldoutManifest {
    seed: u64,
    eval_fraction: f64,
    image_ids: Vec<String>,
    train: Vec<usize>,
    eval: Vec<usize>,
}

fn image_ids(table: &LabelTable) -> Vec<String> {
    table.records.iter().map(|r| r.image_id.clone()).collect()
}

fn kfold_manifest(table: &LabelTable, folds: usize, seed: u64) -> Result<KfoldManifest> {
    let fold_splits = split::stratified_kfold(&table.records, folds, seed)?;
    Ok(KfoldManifest {
        seed,
        image_ids: image_ids(table),
        folds: fold_splits,
    })
}

fn holdout_manifest(table: &LabelTable, eval_fraction: f64, seed: u64) -> Result<HoldoutManifest> {
    let (train, eval) = split::stratified_holdout(&table.records, eval_fraction, seed)?;
    Ok(HoldoutManifest {
        seed,
        eval_fraction,
        image_ids: image_ids(table),
        train,
        eval,
    })
}

fn load_table(path: &PathBuf) -> Result<LabelTable> {
    eprintln!("Loading labels from {:?}...", path);
    let mut table =
        LabelTable::from_csv(path).with_context(|| format!("loading labels from {:?}", path))?;
    let before = table.records.len();
    table.dedup();
    if table.records.len() < before {
        eprintln!(
            "Dropped {} duplicate annotation rows",
            before - table.records.len()
        );
    }
    Ok(table)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Decode {
            rle,
            height,
            width,
            grid,
        } => {
            let decoded = mask::decode(&rle, height, width)?;
            println!("shape: {}x{}", decoded.height, decoded.width);
            println!("foreground pixels: {}", decoded.area());
            println!("has_mask: {}", mask::has_mask(&rle));
            if grid {
                for row in 0..height {
                    let line: String = (0..width)
                        .map(|col| if decoded.get(row, col) > 0 { '#' } else { '.' })
                        .collect();
                    println!("{}", line);
                }
            }
        }

        Command::Stats { labels } => {
            let table = load_table(&labels)?;
            let (with_mask, without_mask) = table.counts();
            println!("records: {}", table.records.len());
            println!("with mask: {}", with_mask);
            println!("without mask: {}", without_mask);
        }

        Command::Validate {
            labels,
            height,
            width,
        } => {
            let table = load_table(&labels)?;
            eprintln!(
                "Validating {} labels at {}x{}...",
                table.records.len(),
                height,
                width
            );
            table.validate(height, width)?;
            println!("ok: {} labels decode cleanly", table.records.len());
        }

        Command::Split {
            labels,
            out,
            folds,
            eval_fraction,
            seed,
            balance,
        } => {
            let mut table = load_table(&labels)?;
            if balance {
                table.resample_balanced(seed);
                let (with_mask, without_mask) = table.counts();
                eprintln!(
                    "Balanced classes: {} with mask, {} without",
                    with_mask, without_mask
                );
            }

            let file =
                File::create(&out).with_context(|| format!("creating manifest {:?}", out))?;
            let writer = BufWriter::new(file);
            match (folds, eval_fraction) {
                (Some(folds), None) => {
                    let manifest = kfold_manifest(&table, folds, seed)?;
                    serde_json::to_writer_pretty(writer, &manifest)?;
                    eprintln!("Wrote {}-fold manifest to {:?}", folds, out);
                }
                (None, Some(eval_fraction)) => {
                    let manifest = holdout_manifest(&table, eval_fraction, seed)?;
                    serde_json::to_writer_pretty(writer, &manifest)?;
                    eprintln!(
                        "Wrote holdout manifest (eval fraction {}) to {:?}",
                        eval_fraction, out
                    );
                }
                _ => bail!("pass either --folds for k-fold or --eval-fraction for a holdout split"),
            }
        }
    }

    Ok(())
}
