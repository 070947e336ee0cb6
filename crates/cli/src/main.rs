mod spoof;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
use pixelmine_core::domain::HashAlgorithm;
use pixelmine_core::search::{SearchConfig, DEFAULT_MAX_ATTEMPTS};

/// pixelmine: perturb an image until its pixel digest starts with a chosen prefix
#[derive(Parser)]
#[command(name = "pixelmine", version, about)]
struct Cli {
    /// Hex prefix the digest must start with (case-insensitive, optional 0x)
    target_prefix: String,

    /// Image to perturb
    input_image: PathBuf,

    /// Where to write the matching image (use a lossless format such as PNG)
    output_image: PathBuf,

    /// Maximum number of attempts before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u64,

    /// Digest algorithm: sha256, sha384 or sha512
    #[arg(long, default_value_t = HashAlgorithm::Sha512)]
    algorithm: HashAlgorithm,

    /// Seed for a reproducible search (default: OS entropy)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of search threads (1 = sequential)
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// Log debug details
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors and hide the progress bar
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }

    fn search_config(&self) -> SearchConfig {
        SearchConfig {
            max_attempts: self.max_attempts,
            algorithm: self.algorithm,
            seed: self.seed,
            workers: self.threads,
            ..SearchConfig::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .format_target(false)
        .init();

    let found = spoof::run(
        &cli.target_prefix,
        &cli.input_image,
        &cli.output_image,
        cli.search_config(),
        cli.quiet,
    )?;

    if found {
        println!(
            "Image hash spoofed successfully. New hash starts with {}",
            cli.target_prefix
        );
    } else {
        println!("Hash spoofing failed.");
    }

    Ok(())
}
