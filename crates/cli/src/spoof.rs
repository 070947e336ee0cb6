use std::path::Path;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use pixelmine_core::domain::{HashAlgorithm, TargetPrefix};
use pixelmine_core::search::{SearchConfig, SearchProgress};
use pixelmine_core::{hasher, imageio, Spoofer};

pub fn run(
    target_prefix: &str,
    input: &Path,
    output: &Path,
    config: SearchConfig,
    quiet: bool,
) -> Result<bool> {
    warn_about_unreachable_targets(target_prefix, output, &config);

    let algorithm = config.algorithm;
    let sequential = config.workers == 1;
    let pb = if quiet || !sequential {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(config.max_attempts)
    };
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let spoofer = Spoofer::new(config);
    let mut matched: Option<String> = None;

    let found = spoofer.spoof_image(
        input,
        output,
        target_prefix,
        Some(&mut |progress| match progress {
            SearchProgress::Loaded { shape, prefix } => {
                info!("Attempting to spoof hash prefix: {prefix}");
                info!("Image dimensions: {shape}");
                info!("Image sample type: u8");
                debug!("Digest algorithm: {algorithm}");
                pb.set_message("mining...");
            }
            SearchProgress::Attempt { attempt } => {
                pb.set_position(attempt);
                pb.suspend(|| info!("Attempt {attempt}: Current hash does not match"));
            }
            SearchProgress::Matched { attempt, digest } => {
                pb.finish_and_clear();
                info!("Success on attempt {attempt}");
                info!("Matched hash: {digest}");
                matched = Some(digest);
            }
            SearchProgress::Exhausted { attempts } => {
                pb.finish_and_clear();
                error!("Could not spoof image hash within {attempts} attempts");
            }
            SearchProgress::Saved { path } => {
                info!("Saved spoofed image to {}", path.display());
            }
        }),
    )?;

    if let Some(digest) = matched.filter(|_| found) {
        verify_saved(output, &digest, algorithm);
    }

    Ok(found)
}

/// Warn early about searches that cannot produce a usable result.
fn warn_about_unreachable_targets(target_prefix: &str, output: &Path, config: &SearchConfig) {
    // An invalid prefix is reported by the search itself.
    if let Ok(prefix) = TargetPrefix::parse(target_prefix) {
        let digest_len = config.algorithm.hex_len();
        if prefix.len() > digest_len {
            warn!(
                "prefix has {} hex digits but a {} digest only has {digest_len}; no attempt can match",
                prefix.len(),
                config.algorithm
            );
        }
    }
    if !imageio::is_lossless_path(output) {
        warn!(
            "{} may be saved with a lossy encoder; the saved pixels may not keep the matched digest",
            output.display()
        );
    }
}

/// Re-decode the saved file and confirm it still hashes to the matched digest.
fn verify_saved(output: &Path, digest: &str, algorithm: HashAlgorithm) {
    match hasher::file_pixel_digest(output, algorithm) {
        Ok(saved) if saved == digest => debug!("saved image reproduces the matched digest"),
        Ok(saved) => warn!(
            "saved image decodes to a different digest ({saved}); use a lossless output format"
        ),
        Err(e) => warn!("could not re-read {} to verify it: {e}", output.display()),
    }
}
