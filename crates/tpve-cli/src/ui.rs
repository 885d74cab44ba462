use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tpve_runtime::readiness::{Readiness, SleepReadiness};

// ---------------------------------------------------------------------------
// Colored message helpers
// ---------------------------------------------------------------------------

fn prefix() -> String {
    "[talos-pve]".bold().cyan().to_string()
}

/// Print an informational message: [talos-pve] message
pub fn info(msg: &str) {
    println!("{} {}", prefix(), msg);
}

/// Print a success message in green.
pub fn success(msg: &str) {
    println!("{} {}", prefix(), msg.green());
}

/// Print an error message to stderr in red.
pub fn error(msg: &str) {
    eprintln!("{} {}", "[talos-pve]".bold().red(), msg.red());
}

pub fn warn(msg: &str) {
    println!("{} {}", prefix(), msg.yellow());
}

/// Print a numbered step: [talos-pve] Step n/total: message
pub fn step(n: usize, total: usize, msg: &str) {
    println!(
        "\n{} {} {}",
        prefix(),
        format!("Step {n}/{total}:").bold().yellow(),
        msg,
    );
}

/// Print a skipped stage, dimmed.
pub fn skipped(msg: &str) {
    println!("{} {}", prefix(), format!("Skipping: {msg}").dimmed());
}

// ---------------------------------------------------------------------------
// Banner
// ---------------------------------------------------------------------------

/// Print a green bold banner box.
pub fn banner(lines: &[&str]) {
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 4;
    let rule = "=".repeat(width);

    println!();
    println!("{}", rule.bold().green());
    for line in lines {
        let pad = width - line.chars().count() - 4;
        println!("{}", format!("  {}{}  ", line, " ".repeat(pad)).bold().green());
    }
    println!("{}", rule.bold().green());
    println!();
}

/// Print a label/value line with the label padded and bold.
pub fn status_line(label: &str, value: &str) {
    let value = if value.is_empty() || value == "-" {
        "-".dimmed().to_string()
    } else {
        value.to_string()
    };
    println!("{} {}", format!("{label:<16}").bold(), value);
}

// ---------------------------------------------------------------------------
// Interactive prompts
// ---------------------------------------------------------------------------

/// Interactive yes/no prompt defaulting to no. A closed or non-interactive
/// terminal counts as no.
pub fn confirm(msg: &str) -> bool {
    inquire::Confirm::new(msg)
        .with_default(false)
        .prompt()
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Spinners
// ---------------------------------------------------------------------------

/// Create and start a spinner with the given message.
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template("{spinner:.cyan} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Real-time pacing that shows a spinner while it waits.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpinnerReadiness {
    inner: SleepReadiness,
}

impl Readiness for SpinnerReadiness {
    fn wait_until_ready(
        &self,
        target: &str,
        ready: &mut dyn FnMut() -> bool,
        timeout: Duration,
    ) -> bool {
        let pb = spinner(&format!("Waiting on {target} (up to {}s)", timeout.as_secs()));
        let result = self.inner.wait_until_ready(target, ready, timeout);
        pb.finish_and_clear();
        result
    }
}
