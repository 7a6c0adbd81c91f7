use std::fmt::Debug;
use std::fmt::Error;
use std::fmt::Formatter;
use std::time::Duration;
use std::time::Instant;

#[derive(Clone, Copy, Debug)]
pub struct GcTimer {
    instant: Instant,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct GcDuration {
    duration: Duration,
}

impl GcTimer {
    pub fn now() -> Self {
        Self { instant: Instant::now() }
    }

    pub fn elapsed(&self) -> GcDuration {
        GcDuration { duration: self.instant.elapsed() }
    }
}

impl GcDuration {
    pub fn to_millis_string(&self) -> String {
        const MICRO_PER_MILLI: u128 = 1_000;
        format!(
            "{}.{:03} ms",
            self.duration.as_micros() / MICRO_PER_MILLI,
            self.duration.as_micros() % MICRO_PER_MILLI
        )
    }

    pub fn to_seconds_string(&self) -> String {
        format!("{}.{:06} s", self.duration.as_secs(), self.duration.subsec_micros())
    }
}

impl From<Duration> for GcDuration {
    fn from(duration: Duration) -> Self {
        Self { duration }
    }
}

impl Debug for GcDuration {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        write!(f, "{:?}", self.duration)
    }
}
