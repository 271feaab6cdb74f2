use std::fmt;

/// Seconds since the Unix epoch, as sent in the `Timestamp` request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(pub i64);

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub trait TimeSource {
    // Return the current time, truncated to whole seconds
    fn current_timestamp(&self) -> Timestamp;
}

#[derive(Clone)]
pub struct SystemTime {}

impl TimeSource for SystemTime {
    fn current_timestamp(&self) -> Timestamp {
        Timestamp(time::OffsetDateTime::now_utc().unix_timestamp())
    }
}

/// A clock that never moves. Makes signatures reproducible in tests.
#[derive(Clone, Copy, Debug)]
pub struct FixedTime(pub Timestamp);

impl TimeSource for FixedTime {
    fn current_timestamp(&self) -> Timestamp {
        self.0
    }
}
