use std::time::Instant;

/// Wall-clock stopwatch for the timed iterations.
#[derive(Debug, Default)]
pub struct IterationTimer {
    started: Option<Instant>,
}

impl IterationTimer {
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Seconds since `start`, or zero if it was never called.
    pub fn elapsed(&self) -> f64 {
        self.started
            .map(|started| started.elapsed().as_secs_f64())
            .unwrap_or_default()
    }
}
