//! Panic hook that reports what discovery was doing when lambdamap crashed.

use super::context::{get_current_context, get_progress, DiscoveryContext};
use std::fmt::Write as _;
use std::panic::PanicHookInfo;
use tracing::Span;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the custom panic hook.
///
/// Call this early in `main()` before discovery begins.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
        let span = Span::current().metadata().map(|m| m.name());
        let report = format_crash_report(
            &extract_panic_message(info),
            location.as_deref(),
            &get_current_context(),
            span,
            get_progress(),
        );
        eprintln!("\n{report}");
        if std::env::var("RUST_BACKTRACE").is_ok() {
            eprintln!("{}", std::backtrace::Backtrace::capture());
        }
    }));
}

fn format_crash_report(
    message: &str,
    location: Option<&str>,
    context: &DiscoveryContext,
    span: Option<&str>,
    (processed, total): (usize, usize),
) -> String {
    let mut out = format!(
        "lambdamap {VERSION} panicked at {}: {message}\n",
        location.unwrap_or("<unknown>")
    );
    let phase = context
        .phase
        .map_or_else(|| "not started".to_string(), |p| p.to_string());
    let _ = writeln!(out, "  phase: {phase}");
    if let Some(span) = span {
        let _ = writeln!(out, "  span: {span}");
    }
    if let Some(function) = &context.current_function {
        let _ = writeln!(out, "  function: {function}");
    }
    if total > 0 {
        let _ = writeln!(out, "  progress: {processed}/{total} functions");
    }
    if std::env::var("RUST_BACKTRACE").is_err() {
        out.push_str("  run with RUST_BACKTRACE=1 for a stack trace\n");
    }
    out
}

fn extract_panic_message(info: &PanicHookInfo<'_>) -> String {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
