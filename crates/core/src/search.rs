use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::domain::{HashAlgorithm, PixelArray, SearchOutcome, Shape, TargetPrefix};
use crate::error::{Error, Result};
use crate::hasher;
use crate::noise;

pub const DEFAULT_MAX_ATTEMPTS: u64 = 50_000;
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1000;

/// Tunables for a prefix search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Upper bound on attempts. Zero means the search is exhausted immediately.
    pub max_attempts: u64,
    /// Digest applied to every candidate.
    pub algorithm: HashAlgorithm,
    /// Emit an `Attempt` event every this many attempts. Zero disables them.
    pub progress_interval: u64,
    /// Seed for the random stream. `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// Number of parallel workers. One runs the plain sequential loop.
    pub workers: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            algorithm: HashAlgorithm::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            seed: None,
            workers: 1,
        }
    }
}

impl SearchConfig {
    /// The random stream this configuration asks for.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Progress callback events for a spoofing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchProgress {
    /// The input image was decoded and the search is about to start.
    Loaded {
        shape: Shape,
        prefix: TargetPrefix,
    },
    /// Periodic report: attempt `attempt` (0-based) did not match.
    Attempt { attempt: u64 },
    /// A candidate matched on attempt `attempt` (1-based).
    Matched { attempt: u64, digest: String },
    /// The budget ran out after `attempts` attempts.
    Exhausted { attempts: u64 },
    /// The matching candidate was written to disk.
    Saved { path: PathBuf },
}

/// One generate, digest and compare cycle.
pub struct Attempt {
    pub strategy: noise::Strategy,
    pub candidate: PixelArray,
    pub digest: String,
}

/// Drives the bounded attempt loop for one configuration.
pub struct Miner {
    config: SearchConfig,
}

impl Miner {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Generate a candidate from `original` and digest it. No side effects
    /// beyond advancing `rng`.
    pub fn attempt<R: Rng>(&self, original: &PixelArray, rng: &mut R) -> Attempt {
        let (strategy, candidate) = noise::generate_candidate(original, rng);
        let digest = hasher::pixel_digest(&candidate, self.config.algorithm);
        Attempt {
            strategy,
            candidate,
            digest,
        }
    }

    /// Sequential search. Reports `Attempt`, `Matched` and `Exhausted`
    /// through `progress_cb` if provided.
    pub fn search<R: Rng>(
        &self,
        original: &PixelArray,
        prefix: &TargetPrefix,
        rng: &mut R,
        mut progress_cb: Option<&mut dyn FnMut(SearchProgress)>,
    ) -> SearchOutcome {
        for index in 0..self.config.max_attempts {
            let attempt = self.attempt(original, rng);

            if prefix.matches(&attempt.digest) {
                log::debug!("attempt {} matched via {}", index + 1, attempt.strategy);
                if let Some(ref mut cb) = progress_cb {
                    cb(SearchProgress::Matched {
                        attempt: index + 1,
                        digest: attempt.digest.clone(),
                    });
                }
                return SearchOutcome::Success {
                    candidate: attempt.candidate,
                    digest: attempt.digest,
                    attempt: index + 1,
                };
            }

            if self.is_progress_tick(index) {
                if let Some(ref mut cb) = progress_cb {
                    cb(SearchProgress::Attempt { attempt: index });
                }
            }
        }

        let attempts = self.config.max_attempts;
        if let Some(ref mut cb) = progress_cb {
            cb(SearchProgress::Exhausted { attempts });
        }
        SearchOutcome::Exhausted { attempts }
    }

    /// Parallel search across `config.workers` threads.
    ///
    /// Attempt indices come from one shared counter, so the budget is global
    /// and never overrun. Each worker owns a random stream seeded from `rng`.
    /// When several workers match, the lowest attempt index wins. Periodic
    /// `Attempt` events are not emitted here since the callback is not `Send`.
    pub fn search_parallel<R: Rng>(
        &self,
        original: &PixelArray,
        prefix: &TargetPrefix,
        rng: &mut R,
    ) -> Result<SearchOutcome> {
        let workers = self.config.workers;
        if workers == 0 {
            return Err(Error::InvalidWorkers);
        }

        let seeds: Vec<u64> = (0..workers).map(|_| rng.gen()).collect();
        let next_index = AtomicU64::new(0);
        let found = AtomicBool::new(false);
        let max_attempts = self.config.max_attempts;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()?;

        let best = pool.install(|| {
            seeds
                .into_par_iter()
                .filter_map(|seed| {
                    let mut worker_rng = StdRng::seed_from_u64(seed);
                    while !found.load(Ordering::Relaxed) {
                        let index = next_index.fetch_add(1, Ordering::Relaxed);
                        if index >= max_attempts {
                            break;
                        }
                        let attempt = self.attempt(original, &mut worker_rng);
                        if prefix.matches(&attempt.digest) {
                            found.store(true, Ordering::Relaxed);
                            return Some((index + 1, attempt));
                        }
                    }
                    None
                })
                .min_by_key(|(attempt_number, _)| *attempt_number)
        });

        Ok(match best {
            Some((attempt, hit)) => SearchOutcome::Success {
                candidate: hit.candidate,
                digest: hit.digest,
                attempt,
            },
            None => SearchOutcome::Exhausted {
                attempts: next_index.load(Ordering::Relaxed).min(max_attempts),
            },
        })
    }

    fn is_progress_tick(&self, index: u64) -> bool {
        self.config.progress_interval != 0 && index % self.config.progress_interval == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_2x2() -> PixelArray {
        PixelArray::new(2, 2, 1, vec![128; 4]).unwrap()
    }

    fn miner(max_attempts: u64) -> Miner {
        Miner::new(SearchConfig {
            max_attempts,
            ..SearchConfig::default()
        })
    }

    fn collect_events(
        miner: &Miner,
        original: &PixelArray,
        prefix: &TargetPrefix,
        seed: u64,
    ) -> (SearchOutcome, Vec<SearchProgress>) {
        let mut events = Vec::new();
        let mut rng = StdRng::seed_from_u64(seed);
        let outcome = miner.search(
            original,
            prefix,
            &mut rng,
            Some(&mut |e: SearchProgress| events.push(e)),
        );
        (outcome, events)
    }

    #[test]
    fn test_empty_prefix_matches_first_attempt() {
        let prefix = TargetPrefix::parse("").unwrap();
        let (outcome, events) = collect_events(&miner(1), &gray_2x2(), &prefix, 1);

        match outcome {
            SearchOutcome::Success {
                candidate,
                digest,
                attempt,
            } => {
                assert_eq!(attempt, 1);
                assert_eq!(digest.len(), 128);
                assert_eq!(candidate.shape(), gray_2x2().shape());
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert!(matches!(
            events.as_slice(),
            [SearchProgress::Matched { attempt: 1, .. }]
        ));
    }

    #[test]
    fn test_zero_budget_exhausts_immediately() {
        let prefix = TargetPrefix::parse("").unwrap();
        let (outcome, events) = collect_events(&miner(0), &gray_2x2(), &prefix, 1);

        assert_eq!(outcome, SearchOutcome::Exhausted { attempts: 0 });
        assert_eq!(events, vec![SearchProgress::Exhausted { attempts: 0 }]);
    }

    #[test]
    fn test_unreachable_prefix_exhausts_budget() {
        let prefix = TargetPrefix::parse(&"ff".repeat(32)).unwrap();
        let (outcome, events) = collect_events(&miner(100), &gray_2x2(), &prefix, 2);

        assert_eq!(outcome, SearchOutcome::Exhausted { attempts: 100 });
        assert_eq!(
            events,
            vec![
                SearchProgress::Attempt { attempt: 0 },
                SearchProgress::Exhausted { attempts: 100 },
            ]
        );
    }

    #[test]
    fn test_progress_every_interval() {
        let prefix = TargetPrefix::parse(&"0".repeat(128)).unwrap();
        let miner = Miner::new(SearchConfig {
            max_attempts: 25,
            progress_interval: 10,
            ..SearchConfig::default()
        });
        let (_, events) = collect_events(&miner, &gray_2x2(), &prefix, 3);

        let ticks: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                SearchProgress::Attempt { attempt } => Some(*attempt),
                _ => None,
            })
            .collect();
        assert_eq!(ticks, vec![0, 10, 20]);
    }

    #[test]
    fn test_progress_disabled_with_zero_interval() {
        let prefix = TargetPrefix::parse(&"0".repeat(128)).unwrap();
        let miner = Miner::new(SearchConfig {
            max_attempts: 5,
            progress_interval: 0,
            ..SearchConfig::default()
        });
        let (_, events) = collect_events(&miner, &gray_2x2(), &prefix, 3);
        assert_eq!(events, vec![SearchProgress::Exhausted { attempts: 5 }]);
    }

    #[test]
    fn test_search_without_callback() {
        let prefix = TargetPrefix::parse("").unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let outcome = miner(3).search(&gray_2x2(), &prefix, &mut rng, None);
        assert!(outcome.is_success());
    }

    #[test]
    fn test_seeded_search_finds_known_first_digest() {
        let original = gray_2x2();
        let m = miner(1);

        // Learn what the first attempt produces for this seed, then target it.
        let first = m.attempt(&original, &mut StdRng::seed_from_u64(11));
        let prefix = TargetPrefix::parse(&first.digest[..3]).unwrap();

        let (outcome, _) = collect_events(&m, &original, &prefix, 11);
        match outcome {
            SearchOutcome::Success { digest, attempt, .. } => {
                assert_eq!(attempt, 1);
                assert_eq!(digest, first.digest);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn test_hex_marker_and_case_are_equivalent() {
        let original = gray_2x2();
        let m = miner(1);
        let first = m.attempt(&original, &mut StdRng::seed_from_u64(12));
        let lower = &first.digest[..2];

        let plain = TargetPrefix::parse(lower).unwrap();
        let marked = TargetPrefix::parse(&format!("0x{}", lower.to_ascii_uppercase())).unwrap();

        let (a, _) = collect_events(&m, &original, &plain, 12);
        let (b, _) = collect_events(&m, &original, &marked, 12);
        assert!(a.is_success());
        assert_eq!(a, b);
    }

    #[test]
    fn test_configured_algorithm_is_used() {
        let prefix = TargetPrefix::parse("").unwrap();
        let m = Miner::new(SearchConfig {
            max_attempts: 1,
            algorithm: HashAlgorithm::Sha256,
            ..SearchConfig::default()
        });
        let (outcome, _) = collect_events(&m, &gray_2x2(), &prefix, 4);

        match outcome {
            SearchOutcome::Success {
                candidate, digest, ..
            } => {
                assert_eq!(digest.len(), 64);
                assert_eq!(digest, hasher::pixel_digest(&candidate, HashAlgorithm::Sha256));
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn test_success_digest_matches_candidate() {
        let prefix = TargetPrefix::parse("").unwrap();
        let (outcome, _) = collect_events(&miner(1), &gray_2x2(), &prefix, 5);
        if let SearchOutcome::Success {
            candidate, digest, ..
        } = outcome
        {
            assert_eq!(digest, hasher::pixel_digest(&candidate, HashAlgorithm::Sha512));
        } else {
            panic!("expected success");
        }
    }

    #[test]
    fn test_parallel_empty_prefix_succeeds() {
        let prefix = TargetPrefix::parse("").unwrap();
        let m = Miner::new(SearchConfig {
            max_attempts: 10,
            workers: 4,
            ..SearchConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(13);
        let outcome = m.search_parallel(&gray_2x2(), &prefix, &mut rng).unwrap();

        match outcome {
            SearchOutcome::Success {
                candidate,
                digest,
                attempt,
            } => {
                assert!((1..=10).contains(&attempt));
                assert_eq!(digest, hasher::pixel_digest(&candidate, HashAlgorithm::Sha512));
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn test_parallel_reports_lowest_attempt() {
        // Every attempt matches an empty prefix. Whichever worker claims index 0
        // finishes it and returns it, so attempt 1 must win however the
        // workers are scheduled.
        let prefix = TargetPrefix::parse("").unwrap();
        for seed in 0..20 {
            let m = Miner::new(SearchConfig {
                max_attempts: 50,
                workers: 4,
                ..SearchConfig::default()
            });
            let mut rng = StdRng::seed_from_u64(seed);
            match m.search_parallel(&gray_2x2(), &prefix, &mut rng).unwrap() {
                SearchOutcome::Success { attempt, .. } => assert_eq!(attempt, 1, "seed {seed}"),
                other => panic!("expected success, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_parallel_budget_is_global() {
        let prefix = TargetPrefix::parse(&"ff".repeat(32)).unwrap();
        let m = Miner::new(SearchConfig {
            max_attempts: 100,
            workers: 3,
            ..SearchConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(14);
        let outcome = m.search_parallel(&gray_2x2(), &prefix, &mut rng).unwrap();
        assert_eq!(outcome, SearchOutcome::Exhausted { attempts: 100 });
    }

    #[test]
    fn test_parallel_zero_budget() {
        let prefix = TargetPrefix::parse("").unwrap();
        let m = Miner::new(SearchConfig {
            max_attempts: 0,
            workers: 2,
            ..SearchConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(15);
        let outcome = m.search_parallel(&gray_2x2(), &prefix, &mut rng).unwrap();
        assert_eq!(outcome, SearchOutcome::Exhausted { attempts: 0 });
    }

    #[test]
    fn test_parallel_rejects_zero_workers() {
        let prefix = TargetPrefix::parse("").unwrap();
        let m = Miner::new(SearchConfig {
            workers: 0,
            ..SearchConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(16);
        assert!(matches!(
            m.search_parallel(&gray_2x2(), &prefix, &mut rng),
            Err(Error::InvalidWorkers)
        ));
    }
}
