use std::time::{Duration, Instant};

/// A simple RAII timer for tracing slow calls.
/// When it goes out of scope it logs the time elapsed since its creation
/// at debug level, tagged with what it was timing.
pub struct Tracer {
    name: &'static str,
    subject: String,
    start_time: Instant,
}

impl Tracer {
    pub fn new(name: &'static str, subject: impl Into<String>) -> Self {
        Tracer {
            name,
            subject: subject.into(),
            start_time: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Drop for Tracer {
    fn drop(&mut self) {
        log::debug!("[Trace] {} ({}): {:.2?}", self.name, self.subject, self.elapsed());
    }
}
