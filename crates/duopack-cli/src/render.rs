use std::io::{self, BufRead, Write};

use anstyle::{AnsiColor, Style};
use anyhow::{Context, Result};
use duopack_core::Settings;

fn accent() -> Style {
    AnsiColor::Green.on_default().bold()
}

pub fn status(settings: &Settings, message: &str) {
    if settings.quiet {
        return;
    }
    let style = accent();
    println!("{}::{} {message}", style.render(), style.render_reset());
}

pub fn say(settings: &Settings, message: &str) {
    if !settings.quiet {
        println!("{message}");
    }
}

pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

// An empty answer counts as yes.
pub fn confirm(settings: &Settings, question: &str) -> Result<bool> {
    if settings.assume_yes {
        return Ok(true);
    }

    print!("{question} [Y/n] ");
    io::stdout().flush().context("failed to flush stdout")?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read confirmation")?;
    let answer = line.trim();
    Ok(answer.is_empty() || answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}
