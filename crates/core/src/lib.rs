pub mod domain;
pub mod error;
pub mod hasher;
pub mod imageio;
pub mod noise;
pub mod search;

use std::path::Path;

use domain::*;
use error::Result;
use search::{Miner, SearchConfig, SearchProgress};

/// The main entry point: load an image, mine a perturbation whose pixel
/// digest starts with a target prefix, and save it.
pub struct Spoofer {
    miner: Miner,
}

impl Spoofer {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            miner: Miner::new(config),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        self.miner.config()
    }

    /// Search for a perturbation of `input_path` whose digest starts with
    /// `target_prefix` and write it to `output_path`.
    ///
    /// Returns `Ok(true)` when a match was found and saved, `Ok(false)` when
    /// the attempt budget ran out (nothing is written). The prefix is
    /// validated before the image is touched. Calls `progress_cb` with
    /// progress updates if provided.
    pub fn spoof_image(
        &self,
        input_path: &Path,
        output_path: &Path,
        target_prefix: &str,
        mut progress_cb: Option<&mut dyn FnMut(SearchProgress)>,
    ) -> Result<bool> {
        let prefix = TargetPrefix::parse(target_prefix)?;
        let original = imageio::load(input_path)?;

        if let Some(ref mut cb) = progress_cb {
            cb(SearchProgress::Loaded {
                shape: original.shape(),
                prefix: prefix.clone(),
            });
        }

        let mut forward = |event: SearchProgress| {
            if let Some(ref mut cb) = progress_cb {
                cb(event);
            }
        };
        let outcome = self.search(&original, &prefix, Some(&mut forward))?;

        match outcome {
            SearchOutcome::Success { candidate, .. } => {
                imageio::save(&candidate, output_path)?;
                if let Some(ref mut cb) = progress_cb {
                    cb(SearchProgress::Saved {
                        path: output_path.to_path_buf(),
                    });
                }
                Ok(true)
            }
            SearchOutcome::Exhausted { .. } => Ok(false),
        }
    }

    /// Run the configured search on an in-memory image.
    /// One worker runs the sequential loop; more use the parallel search,
    /// which reports only the final `Matched`/`Exhausted` event.
    pub fn search(
        &self,
        original: &PixelArray,
        prefix: &TargetPrefix,
        mut progress_cb: Option<&mut dyn FnMut(SearchProgress)>,
    ) -> Result<SearchOutcome> {
        let mut rng = self.config().rng();

        if self.config().workers == 1 {
            return Ok(self.miner.search(original, prefix, &mut rng, progress_cb));
        }

        let outcome = self.miner.search_parallel(original, prefix, &mut rng)?;
        if let Some(ref mut cb) = progress_cb {
            match &outcome {
                SearchOutcome::Success { digest, attempt, .. } => cb(SearchProgress::Matched {
                    attempt: *attempt,
                    digest: digest.clone(),
                }),
                SearchOutcome::Exhausted { attempts } => cb(SearchProgress::Exhausted {
                    attempts: *attempts,
                }),
            }
        }
        Ok(outcome)
    }
}
