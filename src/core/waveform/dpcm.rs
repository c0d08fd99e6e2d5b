use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Lowest level the delta decoder can reach
pub const DPCM_LEVEL_MIN: i16 = -64;
/// Highest level the delta decoder can reach
pub const DPCM_LEVEL_MAX: i16 = 63;

const DPCM_STEP: i16 = 2;
const DPCM_SCALE: i16 = 256;

/// Decode 1-bit delta samples, least significant bit first.
///
/// A set bit raises the level by 2 and a clear bit lowers it by 2. A step that
/// would leave the [-64, 63] window is skipped. Each bit yields one sample of
/// `level * 256`.
pub fn decode_dpcm(data: &[u8]) -> Vec<i16> {
    let mut samples = Vec::with_capacity(data.len() * 8);
    let mut level: i16 = 0;
    for byte in data {
        for bit in 0..8 {
            if byte & (1 << bit) != 0 {
                if level <= DPCM_LEVEL_MAX - DPCM_STEP {
                    level += DPCM_STEP;
                }
            } else if level >= DPCM_LEVEL_MIN + DPCM_STEP {
                level -= DPCM_STEP;
            }
            samples.push(level * DPCM_SCALE);
        }
    }
    samples
}

/// Read and decode a delta sample file
pub fn load_dpcm(path: &Path) -> Result<Vec<i16>> {
    let data = fs::read(path)
        .with_context(|| format!("Failed to read DPCM sample: {}", path.display()))?;
    Ok(decode_dpcm(&data))
}
