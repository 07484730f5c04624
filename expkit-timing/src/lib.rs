pub mod clock;
pub mod scheduler;

pub use clock::{Clock, HighPrecisionClock, ManualClock};
pub use scheduler::{DispatchStats, Fired, LatencySummary, Scheduler, TimerHandle, TimerService};
