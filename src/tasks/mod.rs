//! Background Tasks Module
//!
//! The only background execution in the crate: per-entry expiry timers of
//! the time-to-live cache, run on a tokio runtime.

mod timer;

pub use timer::TimerRuntime;
pub(crate) use timer::ExpiryTimer;
