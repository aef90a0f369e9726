//! Program loader.
//!
//! Two formats are accepted:
//! 1. **Hex text:** One 32-bit word per line (`0x` prefix optional), `#`
//!    comments, and an optional `@<hex>` line setting the base address
//!    before the first word.
//! 2. **Raw binary:** Files ending in `.bin` are read as little-endian words.

use std::fs;
use std::path::Path;

use crate::common::ConfigError;
use crate::core::memory::ProgramImage;
use crate::isa::opcodes::INSTRUCTION_BYTES;

/// Base address when the program does not set one.
pub const DEFAULT_BASE: u64 = 0x8000_0000;

/// Loads a program from `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Program`] for a malformed line or a truncated binary.
pub fn load_program(path: impl AsRef<Path>) -> Result<ProgramImage, ConfigError> {
    let path = path.as_ref();
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    if path.extension().is_some_and(|ext| ext == "bin") {
        let bytes = fs::read(path).map_err(io_err)?;
        let chunks = bytes.chunks_exact(INSTRUCTION_BYTES as usize);
        if !chunks.remainder().is_empty() {
            return Err(ConfigError::Program {
                path: path.to_path_buf(),
                line: 0,
                text: format!("{} bytes", bytes.len()),
                reason: "binary length is not a multiple of 4",
            });
        }
        let words: Vec<u32> = chunks
            .filter_map(|c| <[u8; 4]>::try_from(c).ok())
            .map(u32::from_le_bytes)
            .collect();
        tracing::info!("loaded {} words from {}", words.len(), path.display());
        return Ok(ProgramImage::from_words(DEFAULT_BASE, &words));
    }

    let text = fs::read_to_string(path).map_err(io_err)?;
    let image = parse_program(&text).map_err(|(line, text, reason)| ConfigError::Program {
        path: path.to_path_buf(),
        line,
        text,
        reason,
    })?;
    tracing::info!(
        "loaded {} words at {:#x} from {}",
        image.len(),
        image.entry(),
        path.display()
    );
    Ok(image)
}

/// Parses hex program text.
///
/// # Errors
///
/// Returns `(line, text, reason)` for the first malformed line.
pub fn parse_program(text: &str) -> Result<ProgramImage, (usize, String, &'static str)> {
    let mut base = DEFAULT_BASE;
    let mut words = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        if let Some(addr) = line.strip_prefix('@') {
            if !words.is_empty() {
                return Err((idx + 1, raw.to_string(), "base address after the first word"));
            }
            base = u64::from_str_radix(strip_hex(addr), 16)
                .map_err(|_| (idx + 1, raw.to_string(), "invalid base address"))?;
            continue;
        }
        let word = u32::from_str_radix(strip_hex(line), 16)
            .map_err(|_| (idx + 1, raw.to_string(), "expected a 32-bit hex word"))?;
        words.push(word);
    }

    Ok(ProgramImage::from_words(base, &words))
}

fn strip_hex(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}
