use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use duopack_core::{Fetcher, Settings};
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;

/// Production transport: blocking HTTP with a `.part` staging file so a
/// failed download never leaves a partial artifact at the destination.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    show_progress: bool,
}

impl HttpFetcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("duopack/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(15))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            show_progress: !settings.quiet,
        })
    }

    fn fetch_to(&self, url: &str, out_path: &Path) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("request failed: {url}"))?
            .error_for_status()
            .with_context(|| format!("server reported failure: {url}"))?;

        let mut out = File::create(out_path)
            .with_context(|| format!("failed to create {}", out_path.display()))?;

        let total = response.content_length();
        if self.show_progress {
            let bar = match total {
                Some(total) if total > 0 => {
                    let bar = ProgressBar::new(total);
                    if let Ok(style) = ProgressStyle::with_template(
                        "{bytes:>10}/{total_bytes:10} [{bar:30}] {bytes_per_sec}",
                    ) {
                        bar.set_style(style.progress_chars("=>-"));
                    }
                    bar
                }
                _ => ProgressBar::new_spinner(),
            };
            let mut reader = bar.wrap_read(response);
            io::copy(&mut reader, &mut out)
                .with_context(|| format!("download interrupted: {url}"))?;
            bar.finish_and_clear();
        } else {
            let mut reader = response;
            io::copy(&mut reader, &mut out)
                .with_context(|| format!("download interrupted: {url}"))?;
        }

        Ok(())
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let part_name = format!(
            "{}.part",
            dest.file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("download")
        );
        let part_path = dest.with_file_name(part_name);

        debug!("GET {url}");
        if let Err(err) = self.fetch_to(url, &part_path) {
            let _ = fs::remove_file(&part_path);
            return Err(err);
        }

        if dest.exists() {
            fs::remove_file(dest)
                .with_context(|| format!("failed to replace {}", dest.display()))?;
        }
        fs::rename(&part_path, dest)
            .with_context(|| format!("failed to move download into {}", dest.display()))?;
        Ok(())
    }
}
