use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Dimensions of a pixel grid: rows, columns and samples per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl Shape {
    /// Total number of `u8` samples a buffer of this shape holds.
    pub fn sample_count(&self) -> usize {
        self.height * self.width * self.channels
    }
}

/// Single-channel shapes render as `(h, w)`, multi-channel as `(h, w, c)`.
impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.channels == 1 {
            write!(f, "({}, {})", self.height, self.width)
        } else {
            write!(f, "({}, {}, {})", self.height, self.width, self.channels)
        }
    }
}

/// An image held as a row-major, channel-minor grid of 8-bit samples.
///
/// The sample buffer is private so the shape and buffer length can never
/// drift apart. Perturbation produces a new array via [`PixelArray::with_samples`]
/// instead of mutating an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelArray {
    shape: Shape,
    samples: Vec<u8>,
}

impl PixelArray {
    /// Build a pixel array, checking that `samples` matches the shape.
    pub fn new(height: usize, width: usize, channels: usize, samples: Vec<u8>) -> Result<Self> {
        if !(1..=4).contains(&channels) {
            return Err(Error::UnsupportedChannels(channels));
        }
        let shape = Shape {
            height,
            width,
            channels,
        };
        if samples.len() != shape.sample_count() {
            return Err(Error::SampleCountMismatch {
                expected: shape.sample_count(),
                actual: samples.len(),
            });
        }
        Ok(Self { shape, samples })
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn height(&self) -> usize {
        self.shape.height
    }

    pub fn width(&self) -> usize {
        self.shape.width
    }

    pub fn channels(&self) -> usize {
        self.shape.channels
    }

    /// Raw samples in their fixed serialization order.
    pub fn as_bytes(&self) -> &[u8] {
        &self.samples
    }

    /// A new array with this array's shape and the given samples.
    pub(crate) fn with_samples(&self, samples: Vec<u8>) -> Self {
        debug_assert_eq!(samples.len(), self.samples.len());
        Self {
            shape: self.shape,
            samples,
        }
    }
}

/// A validated, normalized hex prefix that digests are matched against.
///
/// Parsing strips one leading `0x`/`0X` and lowercases the rest, so `"0xAB"`
/// and `"ab"` are the same target. Odd lengths are fine: matching happens on
/// the hex rendering, nibble by nibble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPrefix(String);

impl TargetPrefix {
    /// Only the characters are checked, not byte alignment: `"abc"` is a
    /// valid three-nibble prefix even though it would not decode as bytes.
    pub fn parse(raw: &str) -> Result<Self> {
        let hex = strip_hex_marker(raw);
        if let Some(found) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(Error::InvalidPrefix {
                prefix: raw.to_string(),
                found,
            });
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of hex digits that must match.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a lowercase hex digest starts with this prefix.
    pub fn matches(&self, digest_hex: &str) -> bool {
        strip_hex_marker(digest_hex).starts_with(self.0.as_str())
    }
}

impl fmt::Display for TargetPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn strip_hex_marker(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Digest algorithm applied to candidate sample bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
    #[default]
    Sha512,
}

impl HashAlgorithm {
    /// Length of the lowercase hex rendering of a digest.
    pub fn hex_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 64,
            HashAlgorithm::Sha384 => 96,
            HashAlgorithm::Sha512 => 128,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Sha256 => write!(f, "sha256"),
            HashAlgorithm::Sha384 => write!(f, "sha384"),
            HashAlgorithm::Sha512 => write!(f, "sha512"),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            _ => Err(Error::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Result of a bounded prefix search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A candidate whose digest starts with the target. `attempt` is 1-based.
    Success {
        candidate: PixelArray,
        digest: String,
        attempt: u64,
    },
    /// The attempt budget ran out without a match.
    Exhausted { attempts: u64 },
}

impl SearchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SearchOutcome::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_array_rejects_wrong_sample_count() {
        let err = PixelArray::new(2, 2, 3, vec![0; 11]).unwrap_err();
        assert!(matches!(
            err,
            Error::SampleCountMismatch {
                expected: 12,
                actual: 11
            }
        ));
    }

    #[test]
    fn test_pixel_array_rejects_bad_channel_count() {
        assert!(matches!(
            PixelArray::new(1, 1, 5, vec![0; 5]),
            Err(Error::UnsupportedChannels(5))
        ));
        assert!(matches!(
            PixelArray::new(1, 1, 0, vec![]),
            Err(Error::UnsupportedChannels(0))
        ));
    }

    #[test]
    fn test_shape_display() {
        let gray = PixelArray::new(2, 3, 1, vec![0; 6]).unwrap();
        let rgb = PixelArray::new(2, 3, 3, vec![0; 18]).unwrap();
        assert_eq!(gray.shape().to_string(), "(2, 3)");
        assert_eq!(rgb.shape().to_string(), "(2, 3, 3)");
    }

    #[test]
    fn test_prefix_strips_marker_and_lowercases() {
        let a = TargetPrefix::parse("0xAB").unwrap();
        let b = TargetPrefix::parse("ab").unwrap();
        let c = TargetPrefix::parse("0XaB").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.as_str(), "ab");
    }

    #[test]
    fn test_prefix_rejects_non_hex() {
        let err = TargetPrefix::parse("zzzz").unwrap_err();
        assert!(matches!(err, Error::InvalidPrefix { found: 'z', .. }));
        assert!(err.to_string().contains("zzzz"));
    }

    #[test]
    fn test_prefix_marker_only_stripped_at_start() {
        assert!(TargetPrefix::parse("a0xb").is_err());
    }

    #[test]
    fn test_prefix_empty_and_bare_marker() {
        assert!(TargetPrefix::parse("").unwrap().is_empty());
        assert!(TargetPrefix::parse("0x").unwrap().is_empty());
    }

    #[test]
    fn test_prefix_odd_length_allowed() {
        let prefix = TargetPrefix::parse("abc").unwrap();
        assert_eq!(prefix.len(), 3);
        assert!(prefix.matches("abcdef"));
        assert!(!prefix.matches("abdcef"));
    }

    #[test]
    fn test_prefix_matching() {
        let prefix = TargetPrefix::parse("0xDEAD").unwrap();
        assert!(prefix.matches("deadbeef"));
        assert!(prefix.matches("0xdeadbeef"));
        assert!(!prefix.matches("beefdead"));
        assert!(TargetPrefix::parse("").unwrap().matches("anything"));
    }

    #[test]
    fn test_hash_algorithm_parse_and_display() {
        assert_eq!("sha512".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha512);
        assert_eq!("SHA-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!(HashAlgorithm::Sha384.to_string(), "sha384");
        assert_eq!(HashAlgorithm::default(), HashAlgorithm::Sha512);
        assert!(matches!(
            "md5".parse::<HashAlgorithm>(),
            Err(Error::UnknownAlgorithm(_))
        ));
    }
}
