//! Unified logging and progress UI.
//!
//! [`Notifier`] puts `env_logger` (text logs) and `indicatif` (spinner) behind a single
//! verbosity switch:
//! - [`VerbosityLevel::Quiet`] → only warnings and errors are logged; progress messages
//!   drive a live spinner on stderr.
//! - [`VerbosityLevel::Info`]/[`VerbosityLevel::Debug`]/[`VerbosityLevel::Trace`] → progress
//!   messages become ordinary log records.
//!
//! Results the user asked for (catalog entries, tags, digests) are not log records; they
//! go to stdout through [`Notifier::say`], which pauses the spinner while printing.

use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use std::cell::RefCell;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VerbosityLevel {
    Quiet = 0, // Spinner, warnings and errors only
    Info = 1,  // Text logs at info level
    Debug = 2, // Text logs at debug level
    Trace = 3, // Text logs at trace level
}

impl From<u8> for VerbosityLevel {
    fn from(level: u8) -> Self {
        match level {
            0 => VerbosityLevel::Quiet,
            1 => VerbosityLevel::Info,
            2 => VerbosityLevel::Debug,
            _ => VerbosityLevel::Trace,
        }
    }
}

impl VerbosityLevel {
    pub fn to_log_level(self) -> LevelFilter {
        match self {
            VerbosityLevel::Quiet => LevelFilter::Warn,
            VerbosityLevel::Info => LevelFilter::Info,
            VerbosityLevel::Debug => LevelFilter::Debug,
            VerbosityLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Installs the global `env_logger` for the given verbosity.
///
/// `RUST_LOG` still applies on top of the level picked by `-v`.
pub fn init_logging(verbosity: VerbosityLevel) {
    env_logger::Builder::from_env(Env::default())
        .filter_level(verbosity.to_log_level())
        .format_target(false)
        .init();
}

pub struct Notifier {
    verbosity: VerbosityLevel,
    spinner: RefCell<Option<ProgressBar>>,
}

impl Notifier {
    pub fn new(verbosity_level: u8) -> Self {
        Self {
            verbosity: VerbosityLevel::from(verbosity_level),
            spinner: RefCell::new(None),
        }
    }

    pub fn info(&self, message: &str) {
        match self.verbosity {
            VerbosityLevel::Quiet => {
                // Lazy initialize spinner on first info call
                if self.spinner.borrow().is_none() {
                    *self.spinner.borrow_mut() = Some(new_spinner());
                }
                if let Some(spinner) = self.spinner.borrow().as_ref() {
                    spinner.set_message(message.to_string());
                }
            }
            _ => log::info!("{}", message),
        }
    }

    pub fn debug(&self, message: &str) {
        log::debug!("{}", message);
    }

    pub fn warn(&self, message: &str) {
        self.suspend(|| log::warn!("{}", message));
    }

    /// Prints a line of program output to stdout.
    pub fn say(&self, message: &str) {
        self.suspend(|| println!("{}", message));
    }

    /// Stops the spinner, leaving nothing behind on the terminal.
    pub fn finish(&self) {
        if let Some(spinner) = self.spinner.borrow_mut().take() {
            spinner.finish_and_clear();
        }
    }

    pub fn verbosity_level(&self) -> VerbosityLevel {
        self.verbosity
    }

    fn suspend<F: FnOnce()>(&self, f: F) {
        match self.spinner.borrow().as_ref() {
            Some(spinner) => spinner.suspend(f),
            None => f(),
        }
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        self.finish();
    }
}

fn new_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
