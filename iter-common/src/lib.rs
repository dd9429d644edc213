//! Shared ambient stack for the `iter-worker` and `iter-broker` binaries:
//! logging setup, CLI styling, signal handling.

pub extern crate clap;

use clap::builder::styling::{AnsiColor, Color, Style};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub mod verbose {
    pub use clap_verbosity_flag::{Level, Verbosity};
}

/// Cargo-like terminal color style, shared by both binaries' `--help` output.
pub fn get_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .usage(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::BrightGreen))),
        )
        .header(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::BrightGreen))),
        )
        .literal(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .invalid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .error(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .valid(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
}

/// Logging configuration shared by both binaries.
pub fn logging_setup(
    max_level: &'static tracing::Level,
    log_file: Option<impl std::io::Write + Clone + Send + 'static>,
) {
    use tracing_subscriber::{filter, prelude::*};

    let filter = filter::filter_fn(move |meta| meta.level() <= max_level);

    let terminal_log = tracing_subscriber::fmt::layer()
        .compact()
        .with_file(false)
        .with_target(false)
        .without_time()
        .with_thread_names(false)
        .with_filter(filter.clone());

    let file_log = log_file.map(|file| {
        let file = std::sync::Mutex::new(file);
        tracing_subscriber::fmt::layer()
            .json()
            .with_thread_names(false)
            .with_writer(move || file.lock().unwrap().clone())
            .with_filter(filter)
    });

    tracing_subscriber::registry()
        .with(file_log)
        .with(terminal_log)
        .init();
}

/// A flag flipped by SIGINT/SIGTERM, polled at every suspension point of the
/// worker's and broker's event loops. Signal handlers only ever touch this
/// flag; everything else happens back at loop granularity.
#[derive(Clone)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    /// Installs SIGINT/SIGTERM handlers and ignores SIGPIPE globally, as the
    /// original firmware's `install_signal_handlers` does.
    pub fn install() -> anyhow::Result<Self> {
        let flag = Arc::new(AtomicBool::new(false));
        let setter = flag.clone();
        ctrlc::set_handler(move || {
            setter.store(true, Ordering::SeqCst);
        })?;

        // SAFETY: replaces the default SIGPIPE disposition with ignore,
        // matching the original's `signal(SIGPIPE, SIG_IGN)`. No other
        // signal state is touched.
        unsafe {
            nix::sys::signal::signal(
                nix::sys::signal::Signal::SIGPIPE,
                nix::sys::signal::SigHandler::SigIgn,
            )?;
        }

        Ok(Self(flag))
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Atomically promotes a "current" sink file to "previous", the same
/// current/previous rotation used for both the per-cycle CSV sink and the
/// stdout-redirect log. Silently does nothing if `current` does not exist
/// (e.g. an aborted cycle never wrote anything, or the sink hasn't been
/// opened yet).
pub fn promote_sink(current: &std::path::Path, previous: &std::path::Path) -> anyhow::Result<()> {
    if current.exists() {
        std::fs::rename(current, previous)?;
    }
    Ok(())
}
