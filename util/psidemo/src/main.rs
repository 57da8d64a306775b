//! PSI demo driver.
//!
//! Reads both parties' item lists (or synthesizes overlapping random
//! sets), runs the dual-backend harness once over an in-process engine,
//! and prints the intersection with comparative timings.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use indicatif::ProgressBar;
use mimalloc::MiMalloc;
use psi_engine_native::NativeEngine;
use psi_harness::{RunOutcome, report};

mod synth;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Debug, Parser)]
#[command(
    name = "psidemo",
    about = "Compare two item lists with both PSI backends and report the intersection"
)]
struct Args {
    /// File with Alice's items (newlines or commas separate items).
    #[arg(long, conflicts_with = "random", requires = "bob")]
    alice: Option<PathBuf>,

    /// File with Bob's items.
    #[arg(long, conflicts_with = "random", requires = "alice")]
    bob: Option<PathBuf>,

    /// Generate N random items per party instead of reading files.
    #[arg(long, value_name = "N")]
    random: Option<usize>,

    /// RNG seed for --random.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Baseline repetitions behind the per-call average.
    #[arg(long, default_value_t = psi_harness::BASELINE_REPS)]
    reps: u32,

    /// Print the input sets instead of running the comparison.
    #[arg(long)]
    print_sets: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let (alice, bob) = load_sets(&args)?;

    if args.print_sets {
        println!("# alice");
        for item in &alice {
            println!("{item}");
        }
        println!("# bob");
        for item in &bob {
            println!("{item}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let engine = NativeEngine::new();

    let spinner = ProgressBar::new_spinner();
    spinner.set_message("comparing with both backends...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    let outcome = psi_harness::run_with_reps(&engine, &alice, &bob, args.reps);
    spinner.finish_and_clear();

    match outcome? {
        RunOutcome::Agreed(summary) => {
            println!("comparison count: {}", summary.comparison_count);
            if summary.intersection.is_empty() {
                println!("(no intersection)");
            } else {
                println!("intersection ({} items):", summary.intersection.len());
                for item in &summary.intersection {
                    println!("  {item}");
                }
            }
            println!(
                "baseline:  {} ms (avg over {} calls)",
                report::format_duration(summary.baseline_time),
                args.reps.max(1)
            );
            println!(
                "oblivious: {} ms",
                report::format_duration(summary.oblivious_time)
            );
            println!("slowdown:  {:.2}x", summary.ratio);
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::Inconsistent(mismatch) => {
            eprintln!("ERROR: backend masks disagree; this is an engine bug, not a data condition");
            eprintln!("  baseline:  {:?}", mismatch.baseline);
            eprintln!("  oblivious: {:?}", mismatch.oblivious);
            if let Some(index) = mismatch.first_divergence() {
                eprintln!("  first divergence at index {index}");
            }
            Ok(ExitCode::from(2))
        }
    }
}

fn load_sets(args: &Args) -> anyhow::Result<(Vec<String>, Vec<String>)> {
    if let Some(n) = args.random {
        if n == 0 {
            bail!("--random needs a positive item count");
        }
        let mut rng = synth::seeded_rng(args.seed);
        return Ok(synth::overlapping_sets(n, &mut rng));
    }

    match (&args.alice, &args.bob) {
        (Some(alice), Some(bob)) => Ok((read_items(alice)?, read_items(bob)?)),
        _ => bail!("provide --alice and --bob files, or --random N"),
    }
}

fn read_items(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading items from {}", path.display()))?;
    Ok(parse_items(&text))
}

/// Splits on newlines and commas, trims, and drops empty entries.
fn parse_items(text: &str) -> Vec<String> {
    text.split(['\n', '\r', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_on_newlines_and_commas() {
        assert_eq!(
            parse_items("x\ny, z\r\n ,\n"),
            vec!["x".to_string(), "y".to_string(), "z".to_string()]
        );
    }

    #[test]
    fn parse_of_blank_text_is_empty() {
        assert!(parse_items("").is_empty());
        assert!(parse_items(" \n , \n").is_empty());
    }
}
