//! Process-wide interruption flag
//!
//! SIGINT raises the flag; actor pools poll it while joining and forward it
//! to the run's cancellation flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use signal_hook::consts::signal::SIGINT;
use tracing::{debug, warn};

static INTERRUPTED: OnceLock<Arc<AtomicBool>> = OnceLock::new();

fn flag() -> &'static Arc<AtomicBool> {
    INTERRUPTED.get_or_init(|| Arc::new(AtomicBool::new(false)))
}

/// Register the SIGINT handler
///
/// The first SIGINT raises the flag; a second one while the flag is still
/// set terminates the process with status 1. Failure is logged, not fatal.
pub fn install_interrupt_handler() {
    let flag = flag();
    // Registration order matters: the shutdown check must see the flag
    // before the first SIGINT sets it.
    let registered = signal_hook::flag::register_conditional_shutdown(SIGINT, 1, Arc::clone(flag))
        .and_then(|_| signal_hook::flag::register(SIGINT, Arc::clone(flag)));
    match registered {
        Ok(_) => debug!("SIGINT handler installed"),
        Err(e) => warn!("Failed to install SIGINT handler: {}", e),
    }
}

/// Whether an interruption has been requested
#[inline]
pub fn interrupted() -> bool {
    INTERRUPTED
        .get()
        .is_some_and(|flag| flag.load(Ordering::Relaxed))
}
