//! Startup progress on stderr: a spinner per stage on a terminal, plain
//! `==>` lines otherwise.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

impl UiMode {
    pub fn parse(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "plain" => Ok(Self::Plain),
            "pretty" => Ok(Self::Pretty),
            other => Err(anyhow::anyhow!(
                "unknown ui mode {other:?} (expected auto|plain|pretty)"
            )),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        Self { mode, is_tty }
    }

    fn pretty(&self) -> bool {
        self.is_tty && self.mode != UiMode::Plain
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        if self.pretty() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }
}

/// Reports the stage as done when dropped, unless [`StageGuard::fail`] ran first.
pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
    failed: bool,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
            failed: false,
        }
    }

    pub fn fail(mut self, reason: &str) {
        self.failed = true;
        let message = format!("✘ {}: {}", self.name, reason);
        self.finish(message);
    }

    fn finish(&self, message: String) {
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        if self.failed {
            return;
        }
        let message = format!("✔ {} ({})", self.name, format_duration(self.start.elapsed()));
        self.finish(message);
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modes() {
        assert_eq!(UiMode::parse("Pretty").unwrap(), UiMode::Pretty);
        assert_eq!(UiMode::parse(" plain ").unwrap(), UiMode::Plain);
        assert!(UiMode::parse("fancy").is_err());
    }

    #[test]
    fn plain_without_terminal() {
        assert!(!Ui::new(UiMode::Pretty, false).pretty());
        assert!(!Ui::new(UiMode::Plain, true).pretty());
        assert!(Ui::new(UiMode::Auto, true).pretty());
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(Duration::from_millis(30)), "30ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }
}
