//! Thread-local context tracking for crash reports.
//!
//! Records which discovery phase is running and which function is being
//! processed. Progress counters are global atomics.

use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};

static FUNCTIONS_PROCESSED: AtomicUsize = AtomicUsize::new(0);
static FUNCTIONS_TOTAL: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static CURRENT_CONTEXT: RefCell<DiscoveryContext> = const { RefCell::new(DiscoveryContext::new()) };
}

/// Snapshot of what the run was doing.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryContext {
    pub phase: Option<DiscoveryPhase>,
    /// Function currently being processed
    pub current_function: Option<String>,
}

impl DiscoveryContext {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: None,
            current_function: None,
        }
    }
}

/// Major stages of a discovery run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryPhase {
    Authentication,
    ResourceDiscovery,
    CodeAnalysis,
    Layout,
    OutputGeneration,
}

impl std::fmt::Display for DiscoveryPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::ResourceDiscovery => write!(f, "resource_discovery"),
            Self::CodeAnalysis => write!(f, "code_analysis"),
            Self::Layout => write!(f, "layout"),
            Self::OutputGeneration => write!(f, "output_generation"),
        }
    }
}

/// RAII guard restoring the previous context on drop.
pub struct ContextGuard {
    previous: DiscoveryContext,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CURRENT_CONTEXT.with(|ctx| {
            *ctx.borrow_mut() = self.previous.clone();
        });
    }
}

#[must_use]
pub fn set_phase(phase: DiscoveryPhase) -> ContextGuard {
    CURRENT_CONTEXT.with(|ctx| {
        let previous = ctx.borrow().clone();
        ctx.borrow_mut().phase = Some(phase);
        ContextGuard { previous }
    })
}

#[must_use]
pub fn set_current_function(name: impl Into<String>) -> ContextGuard {
    CURRENT_CONTEXT.with(|ctx| {
        let previous = ctx.borrow().clone();
        ctx.borrow_mut().current_function = Some(name.into());
        ContextGuard { previous }
    })
}

pub fn set_progress(processed: usize, total: usize) {
    FUNCTIONS_PROCESSED.store(processed, Ordering::Relaxed);
    FUNCTIONS_TOTAL.store(total, Ordering::Relaxed);
}

pub fn increment_processed() {
    FUNCTIONS_PROCESSED.fetch_add(1, Ordering::Relaxed);
}

#[must_use]
pub fn get_current_context() -> DiscoveryContext {
    CURRENT_CONTEXT.with(|ctx| ctx.borrow().clone())
}

/// Current progress as (processed, total).
#[must_use]
pub fn get_progress() -> (usize, usize) {
    (
        FUNCTIONS_PROCESSED.load(Ordering::Relaxed),
        FUNCTIONS_TOTAL.load(Ordering::Relaxed),
    )
}

pub fn reset_context() {
    CURRENT_CONTEXT.with(|ctx| {
        *ctx.borrow_mut() = DiscoveryContext::new();
    });
}
