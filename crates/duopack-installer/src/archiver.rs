use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use duopack_core::{Archiver, CompressionKind};

/// Production extraction backend: drives the system `tar` with the flag set
/// matching the sniffed compression.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemArchiver;

impl Archiver for SystemArchiver {
    fn extract(&self, archive: &Path, kind: CompressionKind, dest: &Path) -> Result<()> {
        let mut command = Command::new("tar");
        match kind {
            CompressionKind::Gzip => {
                command.arg("-xzf");
            }
            CompressionKind::Bzip2 => {
                command.arg("-xjf");
            }
            CompressionKind::Xz => {
                command.arg("-xJf");
            }
            CompressionKind::Zstd => {
                command.arg("--zstd").arg("-xf");
            }
        }
        command.arg(archive).arg("-C").arg(dest);
        run_command(&mut command, "tar extraction failed")
    }
}

fn run_command(command: &mut Command, context_message: &str) -> Result<()> {
    let output = command
        .output()
        .with_context(|| format!("{context_message}: command failed to start"))?;
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    Err(anyhow!(
        "{context_message}: status={} stdout='{}' stderr='{}'",
        output.status,
        stdout.trim(),
        stderr.trim()
    ))
}
