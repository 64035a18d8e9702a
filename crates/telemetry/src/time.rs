// Path: crates/telemetry/src/time.rs
use crate::sinks::ClaimMetricsSink;
use std::time::Instant;

/// Reports the lifetime of the timer as a confirmation duration on drop.
pub struct Timer<'a> {
    sink: &'a dyn ClaimMetricsSink,
    start: Instant,
}

impl<'a> Timer<'a> {
    pub fn new(sink: &'a dyn ClaimMetricsSink) -> Self {
        Self {
            sink,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        self.sink
            .observe_confirmation_duration(self.start.elapsed().as_secs_f64());
    }
}
