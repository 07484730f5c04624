use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source, in nanoseconds since the clock was created
pub trait Clock: Clone + Send + Sync {
    fn now_ns(&self) -> u64;

    fn elapsed(&self, since_ns: u64) -> Duration {
        Duration::from_nanos(self.now_ns().saturating_sub(since_ns))
    }

    fn sleep(&self, d: Duration);

    fn sleep_until(&self, deadline_ns: u64) {
        let now = self.now_ns();
        if deadline_ns > now {
            self.sleep(Duration::from_nanos(deadline_ns - now));
        }
    }
}

/// Wall clock with platform sleeps tuned for sub-millisecond wakeups
#[derive(Debug, Clone)]
pub struct HighPrecisionClock {
    start: Instant,
}

#[cfg(feature = "high_precision_timer")]
const SPIN_WINDOW: Duration = Duration::from_micros(200);

impl Clock for HighPrecisionClock {
    fn now_ns(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }

    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }
}

impl HighPrecisionClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(feature = "high_precision_timer")]
        {
            let target = Instant::now() + duration;
            if let Some(coarse) = duration.checked_sub(SPIN_WINDOW) {
                self.os_sleep(coarse);
            }
            while Instant::now() < target {
                std::hint::spin_loop();
            }
        }
        #[cfg(not(feature = "high_precision_timer"))]
        self.os_sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn os_sleep(&self, duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        // SAFETY: `req` is a valid timespec and a null remainder pointer is allowed.
        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn os_sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl Default for HighPrecisionClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Virtual clock: time only moves when someone sleeps or advances it.
///
/// Clones share the same timeline, so a scheduler and a keyboard service
/// built from one `ManualClock` always agree on "now".
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ns: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.now_ns
            .fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn set_ns(&self, ns: u64) {
        self.now_ns.store(ns, Ordering::SeqCst);
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ns() / 1_000_000
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}
