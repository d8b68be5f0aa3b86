//! Tick counter calibration
//!
//! Tiles timestamp with the raw CPU tick counter; the supervisor measures
//! ticks per nanosecond once, before any tile exists, and hands the value to
//! every tile.

use log::{debug, warn};
use std::time::{Duration, Instant};

const CALIBRATION_WINDOW: Duration = Duration::from_millis(10);

/// Raw tick counter (TSC on x86_64, nanoseconds elsewhere)
#[inline]
pub fn ticks() -> u64 {
    #[cfg(target_arch = "x86_64")]
    {
        // SAFETY: rdtsc has no preconditions on x86_64
        unsafe { core::arch::x86_64::_rdtsc() }
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        monotonic_ns()
    }
}

#[cfg(not(target_arch = "x86_64"))]
fn monotonic_ns() -> u64 {
    use std::sync::OnceLock;
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

/// Measure how many ticks elapse per nanosecond.
///
/// Falls back to 1.0 when the measurement is unusable.
pub fn calibrate() -> f64 {
    let start = Instant::now();
    let t0 = ticks();
    while start.elapsed() < CALIBRATION_WINDOW {
        std::hint::spin_loop();
    }
    let t1 = ticks();
    let elapsed_ns = start.elapsed().as_nanos() as f64;

    let tick_per_ns = t1.wrapping_sub(t0) as f64 / elapsed_ns;
    if !tick_per_ns.is_finite() || tick_per_ns <= 0.0 {
        warn!("tick calibration failed, assuming 1 tick per ns");
        return 1.0;
    }
    debug!("calibrated {:.3} ticks per ns", tick_per_ns);
    tick_per_ns
}
