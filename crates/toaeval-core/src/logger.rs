//! Evaluation logger.
//!
//! Each line carries the elapsed run time, the level, the emitting module
//! (without the `toaeval_` crate prefix) and, while the driver works on one,
//! the `<sequence>/<detector>_<descriptor>` being evaluated:
//!
//! ```text
//! [  812.402s  INFO pipeline::dataset S1/FAST_BRIEF] Processed 42 views ...
//! ```
//!
//! Runs last hours, so the elapsed prefix and the combination tag are what
//! make a captured log attributable. Use `init_with_level` once at startup and
//! `set_log_context` around each unit of work.

use std::fmt::Arguments;
use std::io::Write;
use std::sync::{OnceLock, RwLock};
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

static CONTEXT: RwLock<Option<String>> = RwLock::new(None);

/// Tag subsequent log lines with `context` (e.g. `S1/FAST_BRIEF`); `None`
/// clears the tag.
pub fn set_log_context(context: Option<String>) {
    if let Ok(mut current) = CONTEXT.write() {
        *current = context;
    }
}

fn short_target(target: &str) -> &str {
    target.strip_prefix("toaeval_").unwrap_or(target)
}

fn render(
    elapsed: f64,
    level: Level,
    target: &str,
    context: Option<&str>,
    args: &Arguments<'_>,
) -> String {
    match context {
        Some(context) => format!(
            "[{elapsed:9.3}s {level:>5} {} {context}] {args}",
            short_target(target)
        ),
        None => format!("[{elapsed:9.3}s {level:>5} {}] {args}", short_target(target)),
    }
}

struct EvaluationLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for EvaluationLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let context = CONTEXT.read().ok().and_then(|c| c.clone());
        let line = render(
            self.started.elapsed().as_secs_f64(),
            record.level(),
            record.target(),
            context.as_deref(),
            record.args(),
        );
        let _ = writeln!(std::io::stderr(), "{line}");
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<EvaluationLogger> = OnceLock::new();

/// Install the evaluation logger with the provided level filter.
///
/// Calling this more than once is a no-op after the first successful
/// initialization.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| EvaluationLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Install a `tracing` subscriber filtered by `RUST_LOG` (default `info`).
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        let _ = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .json()
            .flatten_event(true)
            .finish()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_carry_module_and_combination() {
        let line = render(
            12.5,
            Level::Info,
            "toaeval_pipeline::dataset",
            Some("S1/FAST_BRIEF"),
            &format_args!("{} views", 3),
        );
        assert_eq!(line, "[   12.500s  INFO pipeline::dataset S1/FAST_BRIEF] 3 views");
    }

    #[test]
    fn lines_without_context_keep_foreign_targets() {
        let line = render(0.0, Level::Warn, "rusqlite", None, &format_args!("busy"));
        assert_eq!(line, "[    0.000s  WARN rusqlite] busy");
    }
}
