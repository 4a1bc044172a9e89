//! Observability infrastructure for crash reports and debugging.
//!
//! - **Tracing**: `tracing` subscriber setup driven by `-v` / `RUST_LOG`
//! - **Panic Hook**: Produces structured crash reports with context
//! - **Context Tracking**: Thread-local discovery phase and function tracking
//!
//! ```ignore
//! use lambdamap::observability::{install_panic_hook, set_phase, DiscoveryPhase};
//!
//! fn main() {
//!     install_panic_hook();
//!     let _phase = set_phase(DiscoveryPhase::ResourceDiscovery);
//!     // If a panic occurs here, the crash report shows the phase
//! }
//! ```

pub mod context;
pub mod panic_hook;
pub mod tracing;

pub use context::{
    get_current_context, get_progress, increment_processed, set_current_function, set_phase,
    set_progress, ContextGuard, DiscoveryContext, DiscoveryPhase,
};
pub use panic_hook::install_panic_hook;
pub use self::tracing::init_tracing;
