use std::path::Path;

use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::domain::{HashAlgorithm, PixelArray};
use crate::error::Result;
use crate::imageio;

/// Digest `bytes` with `algorithm` and render it as lowercase hex.
pub fn digest_hex(algorithm: HashAlgorithm, bytes: &[u8]) -> String {
    match algorithm {
        HashAlgorithm::Sha256 => format!("{:x}", Sha256::digest(bytes)),
        HashAlgorithm::Sha384 => format!("{:x}", Sha384::digest(bytes)),
        HashAlgorithm::Sha512 => format!("{:x}", Sha512::digest(bytes)),
    }
}

/// Digest of a pixel array's raw samples in row-major, channel-minor order.
pub fn pixel_digest(pixels: &PixelArray, algorithm: HashAlgorithm) -> String {
    digest_hex(algorithm, pixels.as_bytes())
}

/// Decode an image file and digest its samples.
/// Used to check that a saved candidate still carries the matched digest
/// after an encode/decode round through the file format.
pub fn file_pixel_digest(path: &Path, algorithm: HashAlgorithm) -> Result<String> {
    let pixels = imageio::load(path)?;
    Ok(pixel_digest(&pixels, algorithm))
}
