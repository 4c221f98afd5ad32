use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionKind {
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl CompressionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
        }
    }
}

/// Detects the compressor from the archive's leading magic bytes.
/// Unrecognized or truncated magics fall back to gzip.
pub fn detect_compression(path: &Path) -> Result<CompressionKind> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open archive for sniffing: {}", path.display()))?;
    let mut magic = [0u8; 4];
    let mut read = 0;
    while read < magic.len() {
        let n = file
            .read(&mut magic[read..])
            .with_context(|| format!("failed to read archive magic: {}", path.display()))?;
        if n == 0 {
            break;
        }
        read += n;
    }

    if read < 2 {
        return Ok(CompressionKind::Gzip);
    }

    let kind = match (magic[0], magic[1]) {
        (0x1f, 0x8b) => CompressionKind::Gzip,
        (0x42, 0x5a) => CompressionKind::Bzip2,
        (0xfd, 0x37) => CompressionKind::Xz,
        (0x28, 0xb5) if read >= 4 && magic[2] == 0x2f && magic[3] == 0xfd => CompressionKind::Zstd,
        _ => CompressionKind::Gzip,
    };
    Ok(kind)
}
